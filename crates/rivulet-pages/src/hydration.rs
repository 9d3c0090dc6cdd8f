//! Hydration Walker
//!
//! While a hydration pass is active, the node-producing primitives in
//! [`client`](crate::client) do not create nodes: they claim the node under
//! the cursor, check that it is what the server should have produced for the
//! same call, and advance the cursor past it. Dynamic regions are skipped as
//! a whole with [`find_matching_end`].
//!
//! The cursor is thread-local state scoped by [`HydrationPass`]; once the
//! pass ends every primitive goes back to creating nodes.

use std::cell::{Cell, RefCell};

use rivulet_dom::Node;
use rivulet_reactive::{HydrationError, Result};
use serde::{Deserialize, Serialize};

use crate::markers::Marker;

/// Options for a hydration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationOptions {
	/// Keep a server text node whose content differs from the client's and
	/// rewrite its data. When disabled the difference is a
	/// [`HydrationError::UnexpectedNode`].
	pub repair_text: bool,
}

impl Default for HydrationOptions {
	fn default() -> Self {
		Self { repair_text: true }
	}
}

impl HydrationOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets whether mismatched text is repaired in place.
	pub fn repair_text(mut self, repair: bool) -> Self {
		self.repair_text = repair;
		self
	}
}

struct WalkerState {
	hydrating: Cell<bool>,
	cursor: RefCell<Option<Node>>,
	options: RefCell<HydrationOptions>,
}

thread_local! {
	static WALKER: WalkerState = WalkerState {
		hydrating: Cell::new(false),
		cursor: RefCell::new(None),
		options: RefCell::new(HydrationOptions::default()),
	};
}

/// Whether a hydration pass is active on this thread.
pub fn is_hydrating() -> bool {
	WALKER.with(|walker| walker.hydrating.get())
}

/// The next server node to consume, if any.
pub fn hydrate_node() -> Option<Node> {
	WALKER.with(|walker| walker.cursor.borrow().clone())
}

/// Moves the cursor to `node`.
pub fn set_hydrate_node(node: Option<Node>) {
	WALKER.with(|walker| *walker.cursor.borrow_mut() = node);
}

/// Options of the active pass.
pub(crate) fn options() -> HydrationOptions {
	WALKER.with(|walker| walker.options.borrow().clone())
}

/// Moves the cursor to the next sibling of the current node and returns it.
///
/// # Errors
///
/// [`HydrationError::NotHydrating`] outside a pass, and
/// [`HydrationError::MissingNode`] when there is no current node or it has
/// no next sibling.
pub fn advance_cursor() -> Result<Node> {
	if !is_hydrating() {
		return Err(HydrationError::NotHydrating.into());
	}
	let next = hydrate_node().and_then(|node| node.next_sibling());
	set_hydrate_node(next.clone());
	next.ok_or_else(|| {
		HydrationError::MissingNode {
			expected: "a next sibling".to_string(),
		}
		.into()
	})
}

/// The end marker closing the region opened by `start`.
///
/// Scans the following siblings (never descending into elements), counting
/// start markers of either kind against end markers. Returns `None` when the
/// siblings run out first.
pub fn find_matching_end(start: &Node) -> Option<Node> {
	let mut depth = 0usize;
	let mut current = start.next_sibling();
	while let Some(node) = current {
		match Marker::of(&node) {
			Some(marker) if marker.is_start() => depth += 1,
			Some(Marker::End) if depth == 0 => return Some(node),
			Some(Marker::End) => depth -= 1,
			_ => {}
		}
		current = node.next_sibling();
	}
	None
}

/// Returns the node under the cursor, or [`HydrationError::MissingNode`]
/// naming what the client expected there.
pub(crate) fn current(expected: impl FnOnce() -> String) -> Result<Node> {
	hydrate_node().ok_or_else(|| {
		HydrationError::MissingNode {
			expected: expected(),
		}
		.into()
	})
}

/// An active hydration pass.
///
/// Creating the guard positions the cursor and raises the hydrating flag;
/// dropping it restores the previous walker state on every exit path.
#[must_use = "the pass ends when the guard is dropped"]
pub struct HydrationPass {
	previous: Option<(bool, Option<Node>, HydrationOptions)>,
}

impl HydrationPass {
	/// Starts a pass with the cursor on `first`.
	pub fn begin(first: Option<Node>, options: HydrationOptions) -> Self {
		tracing::debug!(?first, ?options, "hydration pass started");
		let previous = WALKER.with(|walker| {
			(
				walker.hydrating.replace(true),
				walker.cursor.replace(first),
				walker.options.replace(options),
			)
		});
		Self {
			previous: Some(previous),
		}
	}
}

impl Drop for HydrationPass {
	fn drop(&mut self) {
		if let Some((hydrating, cursor, options)) = self.previous.take() {
			let _ = WALKER.try_with(|walker| {
				walker.hydrating.set(hydrating);
				*walker.cursor.borrow_mut() = cursor;
				*walker.options.borrow_mut() = options;
			});
			tracing::debug!("hydration pass finished");
		}
	}
}
