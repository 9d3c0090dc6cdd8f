//! Mount and hydration entry points.

use rivulet_dom::Node;
use rivulet_reactive::{Block, BlockKind, HydrationError, Result, destroy_block, render};

use crate::client::Anchor;
use crate::hydration::{HydrationOptions, HydrationPass, hydrate_node};

/// A mounted (or hydrated) component tree.
#[derive(Debug)]
pub struct Root {
	block: Block,
	target: Node,
}

impl Root {
	/// The root block; every block of the tree descends from it.
	pub fn block(&self) -> Block {
		self.block
	}

	/// The node the tree was mounted into.
	pub fn target(&self) -> &Node {
		&self.target
	}

	/// Destroys the tree and detaches the nodes it inserted or claimed.
	pub fn unmount(self) {
		destroy_block(self.block);
	}
}

/// Renders `component` into `target`, creating every node.
pub fn mount<F>(target: &Node, mut component: F) -> Result<Root>
where
	F: FnMut(&Anchor) -> Result<()> + 'static,
{
	let anchor = Anchor::append_to(target);
	let block = render(move || component(&anchor), None, BlockKind::Root)?;
	tracing::debug!(%block, "component tree mounted");
	Ok(Root {
		block,
		target: target.clone(),
	})
}

/// Binds `component` to the server-rendered children of `target` with the
/// default [`HydrationOptions`].
pub fn hydrate<F>(target: &Node, component: F) -> Result<Root>
where
	F: FnMut(&Anchor) -> Result<()> + 'static,
{
	hydrate_with(target, HydrationOptions::default(), component)
}

/// Binds `component` to the server-rendered children of `target`.
///
/// The component runs once with the hydration cursor on the first child of
/// `target`; node-producing primitives claim the server nodes instead of
/// creating new ones. Every server node must be claimed.
///
/// # Errors
///
/// Any [`HydrationError`]. The partially hydrated tree is destroyed before
/// the error is returned, detaching the nodes it had claimed; falling back
/// (for example to [`mount`] into a cleared target) is up to the caller.
pub fn hydrate_with<F>(target: &Node, options: HydrationOptions, mut component: F) -> Result<Root>
where
	F: FnMut(&Anchor) -> Result<()> + 'static,
{
	let pass = HydrationPass::begin(target.first_child(), options);
	let anchor = Anchor::append_to(target);
	let block = render(move || component(&anchor), None, BlockKind::Root)?;

	if let Some(leftover) = hydrate_node() {
		destroy_block(block);
		return Err(HydrationError::UnconsumedNodes {
			found: leftover.describe(),
		}
		.into());
	}
	drop(pass);

	tracing::debug!(%block, "component tree hydrated");
	Ok(Root {
		block,
		target: target.clone(),
	})
}
