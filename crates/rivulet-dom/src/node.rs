//! Node handles: traversal, mutation and inspection.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::document::{Document, NodeData, NodeId};

/// Kind of a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	Fragment,
}

/// Handle to one node of a [`Document`].
///
/// Two handles are equal when they refer to the same node. A node that is
/// neither attached to a parent nor referenced by any handle is freed along
/// with its unreferenced descendants.
pub struct Node {
	doc: Document,
	id: NodeId,
}

impl Node {
	pub(crate) fn from_parts(doc: Document, id: NodeId) -> Self {
		doc.tree.borrow_mut().entry_mut(id).handles += 1;
		Self { doc, id }
	}

	pub(crate) fn id(&self) -> NodeId {
		self.id
	}

	fn wrap(&self, id: Option<NodeId>) -> Option<Node> {
		id.map(|id| Node::from_parts(self.doc.clone(), id))
	}

	/// The document owning this node.
	pub fn document(&self) -> Document {
		self.doc.clone()
	}

	/// Kind of this node.
	pub fn kind(&self) -> NodeKind {
		match self.doc.tree.borrow().entry(self.id).data {
			NodeData::Element { .. } => NodeKind::Element,
			NodeData::Text(_) => NodeKind::Text,
			NodeData::Comment(_) => NodeKind::Comment,
			NodeData::Fragment => NodeKind::Fragment,
		}
	}

	pub fn is_element(&self) -> bool {
		self.kind() == NodeKind::Element
	}

	pub fn is_text(&self) -> bool {
		self.kind() == NodeKind::Text
	}

	pub fn is_comment(&self) -> bool {
		self.kind() == NodeKind::Comment
	}

	/// Lowercase tag name of an element.
	pub fn tag_name(&self) -> Option<String> {
		match &self.doc.tree.borrow().entry(self.id).data {
			NodeData::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	/// Data of a text or comment node.
	pub fn text(&self) -> Option<String> {
		match &self.doc.tree.borrow().entry(self.id).data {
			NodeData::Text(data) | NodeData::Comment(data) => Some(data.clone()),
			_ => None,
		}
	}

	/// Concatenated data of every descendant text node.
	pub fn text_content(&self) -> String {
		let tree = self.doc.tree.borrow();
		let mut out = String::new();
		let mut stack = vec![self.id];
		while let Some(id) = stack.pop() {
			let entry = tree.entry(id);
			if let NodeData::Text(data) = &entry.data {
				out.push_str(data);
			}
			stack.extend(entry.children.iter().rev());
		}
		out
	}

	/// Replaces the data of a text or comment node. On elements and
	/// fragments, replaces every child with a single text node.
	pub fn set_text(&self, value: &str) {
		{
			let mut tree = self.doc.tree.borrow_mut();
			match &mut tree.entry_mut(self.id).data {
				NodeData::Text(data) | NodeData::Comment(data) => {
					*data = value.to_string();
					return;
				}
				NodeData::Element { .. } | NodeData::Fragment => {}
			}
		}
		self.clear_children();
		if !value.is_empty() {
			let text = self.doc.create_text(value);
			self.append_child(&text);
		}
	}

	/// Value of the attribute `name` of an element.
	pub fn attribute(&self, name: &str) -> Option<String> {
		match &self.doc.tree.borrow().entry(self.id).data {
			NodeData::Element { attributes, .. } => attributes
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	/// Attributes of an element in insertion order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		match &self.doc.tree.borrow().entry(self.id).data {
			NodeData::Element { attributes, .. } => attributes.clone(),
			_ => Vec::new(),
		}
	}

	/// Sets (or replaces) an attribute. Ignored on non-elements.
	pub fn set_attribute(&self, name: &str, value: &str) {
		let mut tree = self.doc.tree.borrow_mut();
		if let NodeData::Element { attributes, .. } = &mut tree.entry_mut(self.id).data {
			match attributes.iter_mut().find(|(key, _)| key == name) {
				Some((_, existing)) => *existing = value.to_string(),
				None => attributes.push((name.to_string(), value.to_string())),
			}
		}
	}

	/// Removes an attribute if present.
	pub fn remove_attribute(&self, name: &str) {
		let mut tree = self.doc.tree.borrow_mut();
		if let NodeData::Element { attributes, .. } = &mut tree.entry_mut(self.id).data {
			attributes.retain(|(key, _)| key != name);
		}
	}

	pub fn parent(&self) -> Option<Node> {
		let parent = self.doc.tree.borrow().entry(self.id).parent;
		self.wrap(parent)
	}

	pub fn first_child(&self) -> Option<Node> {
		let child = self.doc.tree.borrow().entry(self.id).children.first().copied();
		self.wrap(child)
	}

	pub fn last_child(&self) -> Option<Node> {
		let child = self.doc.tree.borrow().entry(self.id).children.last().copied();
		self.wrap(child)
	}

	pub fn next_sibling(&self) -> Option<Node> {
		self.sibling(1)
	}

	pub fn previous_sibling(&self) -> Option<Node> {
		self.sibling(-1)
	}

	fn sibling(&self, step: isize) -> Option<Node> {
		let sibling = {
			let tree = self.doc.tree.borrow();
			let parent = tree.entry(self.id).parent?;
			let siblings = &tree.entry(parent).children;
			let index = siblings.iter().position(|&id| id == self.id)?;
			index
				.checked_add_signed(step)
				.and_then(|index| siblings.get(index).copied())
		};
		self.wrap(sibling)
	}

	/// Children in document order.
	pub fn children(&self) -> Vec<Node> {
		let ids = self.doc.tree.borrow().entry(self.id).children.clone();
		ids.into_iter()
			.map(|id| Node::from_parts(self.doc.clone(), id))
			.collect()
	}

	/// Appends `child` (moving it if it is attached elsewhere).
	pub fn append_child(&self, child: &Node) {
		self.insert_before(child, None);
	}

	/// Inserts `child` before `reference`, or at the end when `reference` is
	/// `None`. A reference that is not a child of this node also appends.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		if !self.doc.same_as(&child.doc) {
			tracing::warn!("insert_before: node belongs to another document");
			return;
		}
		let mut tree = self.doc.tree.borrow_mut();
		if tree.is_inclusive_ancestor(child.id, self.id) {
			tracing::warn!("insert_before: refusing to insert a node into itself");
			return;
		}
		if reference.is_some_and(|reference| reference.id == child.id) {
			return;
		}
		// Detach first so the reference index is computed on the final list.
		if !matches!(tree.entry(child.id).data, NodeData::Fragment) {
			tree.detach(child.id);
		}
		let children = &tree.entry(self.id).children;
		let position = reference
			.filter(|reference| self.doc.same_as(&reference.doc))
			.and_then(|reference| children.iter().position(|&id| id == reference.id))
			.unwrap_or(children.len());
		tree.insert_at(self.id, child.id, position);
	}

	/// Detaches this node from its parent. The node stays usable and can be
	/// inserted again.
	pub fn remove(&self) {
		self.doc.tree.borrow_mut().detach(self.id);
	}

	/// Detaches every child.
	pub fn clear_children(&self) {
		let mut tree = self.doc.tree.borrow_mut();
		let children = std::mem::take(&mut tree.entry_mut(self.id).children);
		for child in children {
			tree.entry_mut(child).parent = None;
			tree.collect(child);
		}
	}

	/// Short human-readable description, e.g. `<div>`, `text "hi"`,
	/// `comment <!--[-->`.
	pub fn describe(&self) -> String {
		match &self.doc.tree.borrow().entry(self.id).data {
			NodeData::Element { tag, .. } => format!("<{}>", tag),
			NodeData::Text(data) => format!("text {:?}", data),
			NodeData::Comment(data) => format!("comment <!--{}-->", data),
			NodeData::Fragment => "fragment".to_string(),
		}
	}
}

impl Clone for Node {
	fn clone(&self) -> Self {
		Node::from_parts(self.doc.clone(), self.id)
	}
}

impl Drop for Node {
	fn drop(&mut self) {
		// Handles dropped while the tree is borrowed keep their entry alive.
		let Ok(mut tree) = self.doc.tree.try_borrow_mut() else {
			return;
		};
		let Some(entry) = tree.entries.get_mut(self.id) else {
			return;
		};
		entry.handles = entry.handles.saturating_sub(1);
		if entry.handles == 0 && entry.parent.is_none() {
			tree.collect(self.id);
		}
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id && self.doc.same_as(&other.doc)
	}
}

impl Eq for Node {}

impl Hash for Node {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Node{:?}({})", self.id, self.describe())
	}
}
