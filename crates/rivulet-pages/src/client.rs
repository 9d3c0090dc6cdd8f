//! Node-producing client primitives.
//!
//! Every primitive works in two modes. When mounting it creates nodes and
//! inserts them at an [`Anchor`]. While a hydration pass is active it claims
//! the node under the hydration cursor instead, after checking that it is
//! what the server produced for the same call.
//!
//! Nodes inserted (or claimed) directly at a tracked anchor are owned by the
//! block currently rendering: they are detached when that block re-runs or is
//! destroyed. Children of an element go away with the element, so the anchor
//! handed to an element's children does not track them.

use rivulet_dom::{Document, Node};
use rivulet_reactive::{Block, BlockKind, HydrationError, Result, on_cleanup, render, untrack};

use crate::hydration::{self, is_hydrating, set_hydrate_node};
use crate::markers::Marker;

/// Insertion point for nodes: a parent and the node to insert before.
#[derive(Debug, Clone)]
pub struct Anchor {
	parent: Node,
	before: Option<Node>,
	tracked: bool,
}

impl Anchor {
	/// Appends to the end of `parent`.
	pub fn append_to(parent: &Node) -> Self {
		Self {
			parent: parent.clone(),
			before: None,
			tracked: true,
		}
	}

	/// Inserts before `node`, inside its parent. `None` when `node` is
	/// detached.
	pub fn before(node: &Node) -> Option<Self> {
		Some(Self {
			parent: node.parent()?,
			before: Some(node.clone()),
			tracked: true,
		})
	}

	/// Anchor whose inserted nodes are not owned by the rendering block.
	pub(crate) fn untracked(mut self) -> Self {
		self.tracked = false;
		self
	}

	pub fn parent(&self) -> &Node {
		&self.parent
	}

	pub fn reference(&self) -> Option<&Node> {
		self.before.as_ref()
	}

	pub fn document(&self) -> Document {
		self.parent.document()
	}

	/// Inserts `node` and hands its ownership to the rendering block.
	pub fn insert(&self, node: &Node) {
		self.parent.insert_before(node, self.before.as_ref());
		self.own(node);
	}

	/// Registers a teardown detaching `node` with the rendering block.
	pub(crate) fn own(&self, node: &Node) {
		if self.tracked {
			let node = node.clone();
			on_cleanup(move || node.remove());
		}
	}
}

/// Server separator between two adjacent text nodes.
fn is_separator(node: &Node) -> bool {
	node.is_comment() && node.text().is_some_and(|data| data.is_empty())
}

/// Creates (or claims) a static text node.
///
/// An empty `value` produces no server output; when hydrating, an empty text
/// node is created in place unless the cursor is already on a text node.
pub fn text(anchor: &Anchor, value: &str) -> Result<Node> {
	if !is_hydrating() {
		let node = anchor.document().create_text(value);
		anchor.insert(&node);
		return Ok(node);
	}

	let mut cursor = hydration::hydrate_node();
	if !value.is_empty()
		&& let Some(separator) = cursor.clone().filter(is_separator)
	{
		anchor.own(&separator);
		cursor = separator.next_sibling();
		set_hydrate_node(cursor.clone());
	}

	match cursor {
		Some(node) if node.is_text() => {
			let server = node.text().unwrap_or_default();
			if server != value {
				if !hydration::options().repair_text {
					return Err(HydrationError::UnexpectedNode {
						expected: format!("text {:?}", value),
						found: node.describe(),
					}
					.into());
				}
				tracing::debug!(server = %server, client = %value, "repairing text during hydration");
				node.set_text(value);
			}
			anchor.own(&node);
			set_hydrate_node(node.next_sibling());
			Ok(node)
		}
		cursor if value.is_empty() => {
			let node = anchor.document().create_text("");
			match cursor.as_ref().and_then(|next| next.parent().map(|parent| (parent, next))) {
				Some((parent, next)) => parent.insert_before(&node, Some(next)),
				None => anchor.parent().insert_before(&node, anchor.reference()),
			}
			anchor.own(&node);
			Ok(node)
		}
		Some(node) => Err(HydrationError::UnexpectedNode {
			expected: format!("text {:?}", value),
			found: node.describe(),
		}
		.into()),
		None => Err(HydrationError::MissingNode {
			expected: format!("text {:?}", value),
		}
		.into()),
	}
}

/// Creates (or claims) an element, applies `attributes` and renders its
/// children through `children`.
///
/// When hydrating, every server child must be consumed by `children`.
pub fn element<F>(anchor: &Anchor, tag: &str, attributes: &[(&str, &str)], children: F) -> Result<Node>
where
	F: FnOnce(&Anchor) -> Result<()>,
{
	if !is_hydrating() {
		let node = anchor.document().create_element(tag);
		for (name, value) in attributes {
			node.set_attribute(name, value);
		}
		anchor.insert(&node);
		children(&Anchor::append_to(&node).untracked())?;
		return Ok(node);
	}

	let expected = || format!("<{}>", tag.to_ascii_lowercase());
	let node = hydration::current(expected)?;
	let matches = node
		.tag_name()
		.is_some_and(|found| found.eq_ignore_ascii_case(tag));
	if !matches {
		return Err(HydrationError::UnexpectedNode {
			expected: expected(),
			found: node.describe(),
		}
		.into());
	}
	for (name, value) in attributes {
		if node.attribute(name).as_deref() != Some(*value) {
			node.set_attribute(name, value);
		}
	}
	anchor.own(&node);

	set_hydrate_node(node.first_child());
	children(&Anchor::append_to(&node).untracked())?;
	if let Some(leftover) = hydration::hydrate_node() {
		return Err(HydrationError::UnconsumedNodes {
			found: leftover.describe(),
		}
		.into());
	}
	set_hydrate_node(node.next_sibling());
	Ok(node)
}

/// A text node whose content follows `value`.
pub fn reactive_text<F>(anchor: &Anchor, value: F) -> Result<Node>
where
	F: Fn() -> String + 'static,
{
	let node = text(anchor, &untrack(&value))?;
	let target = node.clone();
	render(
		move || {
			let value = value();
			if target.text().as_deref() != Some(value.as_str()) {
				target.set_text(&value);
			}
			Ok(())
		},
		None,
		BlockKind::Render,
	)?;
	Ok(node)
}

/// Keeps the attribute `name` of `node` in sync with `value`; `None` removes
/// the attribute.
pub fn reactive_attr<F>(node: &Node, name: &str, value: F) -> Result<Block>
where
	F: Fn() -> Option<String> + 'static,
{
	let (node, name) = (node.clone(), name.to_string());
	render(
		move || {
			match value() {
				Some(value) if node.attribute(&name).as_deref() != Some(value.as_str()) => {
					node.set_attribute(&name, &value);
				}
				Some(_) => {}
				None => node.remove_attribute(&name),
			}
			Ok(())
		},
		None,
		BlockKind::Render,
	)
}

/// A dynamic region in the sibling stream: between a start and an end marker
/// when hydrating, or before a placeholder comment when mounting.
pub(crate) struct Region {
	pub(crate) start: Option<Node>,
	pub(crate) end: Node,
	parent: Node,
	hydrating: bool,
}

impl Region {
	/// Claims the region's markers under the cursor, or creates its
	/// placeholder comments (a start comment only with `with_start`).
	pub(crate) fn open(anchor: &Anchor, with_start: bool) -> Result<Self> {
		if !is_hydrating() {
			let doc = anchor.document();
			let start = with_start.then(|| doc.create_comment(""));
			if let Some(start) = &start {
				anchor.insert(start);
			}
			let end = doc.create_comment("");
			anchor.insert(&end);
			return Ok(Self {
				start,
				end,
				parent: anchor.parent().clone(),
				hydrating: false,
			});
		}

		let start = hydration::current(|| Marker::Start.to_string())?;
		match Marker::of(&start) {
			Some(marker) if marker.is_start() => {}
			Some(Marker::End) => return Err(HydrationError::UnexpectedEndMarker.into()),
			_ => {
				return Err(HydrationError::UnexpectedNode {
					expected: Marker::Start.to_string(),
					found: start.describe(),
				}
				.into());
			}
		}
		let end = hydration::find_matching_end(&start).ok_or(HydrationError::UnbalancedMarkers)?;
		anchor.own(&start);
		anchor.own(&end);
		set_hydrate_node(start.next_sibling());
		Ok(Self {
			start: Some(start),
			end,
			parent: anchor.parent().clone(),
			hydrating: true,
		})
	}

	/// Anchor for the region's content: right before its end.
	pub(crate) fn inner(&self) -> Anchor {
		Anchor {
			parent: self.parent.clone(),
			before: Some(self.end.clone()),
			tracked: true,
		}
	}

	/// Checks that the region's content consumed every server node, then
	/// moves the cursor past the end marker.
	pub(crate) fn close(&self) -> Result<()> {
		if !self.hydrating {
			return Ok(());
		}
		match hydration::hydrate_node() {
			Some(node) if node == self.end => {
				set_hydrate_node(self.end.next_sibling());
				Ok(())
			}
			Some(node) => Err(HydrationError::UnconsumedNodes {
				found: node.describe(),
			}
			.into()),
			None => Err(HydrationError::MissingNode {
				expected: Marker::End.to_string(),
			}
			.into()),
		}
	}
}
