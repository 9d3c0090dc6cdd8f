//! The node arena shared by every handle of one document.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::SlotMap;

use crate::node::Node;

/// Character data or element payload of an arena entry.
#[derive(Debug, Clone)]
pub(crate) enum NodeData {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
	},
	Text(String),
	Comment(String),
	Fragment,
}

slotmap::new_key_type! {
	/// Arena key of one node.
	pub(crate) struct NodeId;
}

#[derive(Debug)]
pub(crate) struct Entry {
	pub(crate) data: NodeData,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
	/// Live [`Node`] handles pointing at this entry.
	pub(crate) handles: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Tree {
	pub(crate) entries: SlotMap<NodeId, Entry>,
	/// Nodes created through the public creation API.
	pub(crate) created: usize,
}

impl Tree {
	pub(crate) fn push(&mut self, data: NodeData) -> NodeId {
		self.entries.insert(Entry {
			data,
			parent: None,
			children: Vec::new(),
			handles: 0,
		})
	}

	pub(crate) fn entry(&self, id: NodeId) -> &Entry {
		&self.entries[id]
	}

	pub(crate) fn entry_mut(&mut self, id: NodeId) -> &mut Entry {
		&mut self.entries[id]
	}

	/// Unlinks `id` from its parent, if any.
	pub(crate) fn detach(&mut self, id: NodeId) {
		if let Some(parent) = self.entries[id].parent.take() {
			self.entries[parent].children.retain(|&child| child != id);
		}
	}

	/// Whether `ancestor` is `id` or one of its ancestors.
	pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
		let mut current = Some(id);
		while let Some(node) = current {
			if node == ancestor {
				return true;
			}
			current = self.entries[node].parent;
		}
		false
	}

	/// Inserts `child` into `parent` before the child at `position`.
	/// Fragments are replaced by their children.
	pub(crate) fn insert_at(&mut self, parent: NodeId, child: NodeId, position: usize) {
		let moved = match self.entries[child].data {
			NodeData::Fragment => std::mem::take(&mut self.entries[child].children),
			_ => {
				self.detach(child);
				vec![child]
			}
		};
		let position = position.min(self.entries[parent].children.len());
		for (offset, &node) in moved.iter().enumerate() {
			self.entries[node].parent = Some(parent);
			self.entries[parent].children.insert(position + offset, node);
		}
	}

	/// Frees `id` and its subtree once nothing reaches it: no parent and no
	/// handle. Descendants still held by a handle survive as detached roots.
	pub(crate) fn collect(&mut self, id: NodeId) {
		let mut stack = vec![id];
		while let Some(id) = stack.pop() {
			let unreachable = self
				.entries
				.get(id)
				.is_some_and(|entry| entry.parent.is_none() && entry.handles == 0);
			if !unreachable {
				continue;
			}
			let Some(entry) = self.entries.remove(id) else {
				continue;
			};
			for child in entry.children {
				if let Some(orphan) = self.entries.get_mut(child) {
					orphan.parent = None;
				}
				stack.push(child);
			}
		}
	}
}

/// A document: the owner of every node created from it.
///
/// Cloning a `Document` clones the handle, not the tree.
#[derive(Clone, Default)]
pub struct Document {
	pub(crate) tree: Rc<RefCell<Tree>>,
}

impl Document {
	/// Creates an empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached element.
	pub fn create_element(&self, tag: &str) -> Node {
		self.create(NodeData::Element {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
		})
	}

	/// Creates a detached text node.
	pub fn create_text(&self, data: &str) -> Node {
		self.create(NodeData::Text(data.to_string()))
	}

	/// Creates a detached comment node.
	pub fn create_comment(&self, data: &str) -> Node {
		self.create(NodeData::Comment(data.to_string()))
	}

	/// Creates an empty fragment. Inserting a fragment moves its children.
	pub fn create_fragment(&self) -> Node {
		self.create(NodeData::Fragment)
	}

	/// Number of nodes created with the `create_*` methods so far. Nodes
	/// produced by HTML parsing are not counted.
	pub fn nodes_created(&self) -> usize {
		self.tree.borrow().created
	}

	/// Number of nodes currently stored. Detached subtrees are freed once no
	/// handle refers to them.
	pub fn live_nodes(&self) -> usize {
		self.tree.borrow().entries.len()
	}

	fn create(&self, data: NodeData) -> Node {
		let id = {
			let mut tree = self.tree.borrow_mut();
			tree.created += 1;
			tree.push(data)
		};
		Node::from_parts(self.clone(), id)
	}

	pub(crate) fn same_as(&self, other: &Document) -> bool {
		Rc::ptr_eq(&self.tree, &other.tree)
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("nodes", &self.tree.borrow().entries.len())
			.finish()
	}
}
