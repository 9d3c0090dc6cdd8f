//! Block - Disposable Render Scopes
//!
//! A [`Block`] is one reactive render scope: a render function, the cells it
//! read during its last run, the child blocks it created, and the teardowns
//! that release whatever it produced (typically DOM nodes).
//!
//! ## Lifecycle
//!
//! - **create**: [`render`] / [`branch`] construct the block and run it once
//!   with the block on top of the observer stack.
//! - **re-run**: the scheduler re-executes the function. Before it does, the
//!   previous dependency set is dropped, teardowns run and children are
//!   destroyed (control-flow blocks keep their branches).
//! - **destroy**: [`destroy_block`] releases children first, then the block's
//!   own teardowns, then every edge to a cell. Destroying twice is a no-op.
//!   A block asking to destroy itself from inside its own render function is
//!   destroyed right after that run returns.
//!
//! ## Example
//!
//! ```ignore
//! use rivulet_reactive::{BlockKind, Tracked, flush, render};
//!
//! let count = Tracked::new(0);
//! let block = render(
//!     {
//!         let count = count.clone();
//!         move || {
//!             println!("count = {}", count.get());
//!             Ok(())
//!         }
//!     },
//!     None,
//!     BlockKind::Render,
//! )?;
//!
//! count.set(1);
//! flush()?; // prints "count = 1"
//! block.destroy();
//! ```

use alloc::boxed::Box;

use crate::error::Result;
use crate::runtime::{Block, BlockKind, DestroyPlan, ObserverScope, with_runtime};

/// Constructs a block, runs `f` once under it and returns the handle.
///
/// `parent` defaults to the block currently rendering. When the initial run
/// fails, the block is destroyed before the error is returned.
pub fn render<F>(f: F, parent: Option<Block>, kind: BlockKind) -> Result<Block>
where
	F: FnMut() -> Result<()> + 'static,
{
	let block = Block::next();
	let parent = parent.or_else(current_block);
	with_runtime(|rt| rt.insert_block(block, parent, kind, Box::new(f)));
	tracing::trace!(%block, ?kind, parent = ?parent, "block created");

	if let Err(error) = run_block(block) {
		destroy_block(block);
		return Err(error);
	}
	Ok(block)
}

/// Constructs a [`BlockKind::Branch`] child of the block currently rendering.
///
/// Used for one side of a conditional or one item of a list.
pub fn branch<F>(f: F) -> Result<Block>
where
	F: FnMut() -> Result<()> + 'static,
{
	render(f, None, BlockKind::Branch)
}

/// Executes the render function of `block` once.
///
/// Unknown, destroyed or already-running blocks are skipped.
pub(crate) fn run_block(block: Block) -> Result<()> {
	let Some(plan) = with_runtime(|rt| rt.prepare_run(block)) else {
		return Ok(());
	};

	for child in plan.stale_children {
		destroy_block(child);
	}
	for teardown in plan.teardowns.into_iter().rev() {
		teardown();
	}

	let mut render = plan.render;
	let result = {
		let _scope = ObserverScope::enter(Some(block));
		render()
	};

	let (destroy_now, orphaned) = with_runtime(|rt| rt.finish_run(block, render));
	drop(orphaned);
	if destroy_now {
		destroy_block(block);
	}
	result
}

/// Destroys `block`: children first, then its teardowns, then its edges to
/// every cell. Idempotent.
pub fn destroy_block(block: Block) {
	match with_runtime(|rt| rt.begin_destroy(block)) {
		DestroyPlan::Skip => {}
		DestroyPlan::Deferred => {
			tracing::warn!(%block, "destroy requested while rendering; deferred until the run returns");
		}
		DestroyPlan::Release {
			children,
			teardowns,
			render,
		} => {
			for child in children {
				destroy_block(child);
			}
			for teardown in teardowns.into_iter().rev() {
				teardown();
			}
			drop(render);
			with_runtime(|rt| rt.finish_destroy(block));
			tracing::trace!(%block, "block destroyed");
		}
	}
}

/// The block whose render function is executing, if any.
pub fn current_block() -> Option<Block> {
	with_runtime(|rt| rt.current_observer())
}

/// Registers `f` to run when the current block re-runs or is destroyed.
///
/// Outside of any block the teardown is dropped without running.
pub fn on_cleanup<F>(f: F)
where
	F: FnOnce() + 'static,
{
	let Some(block) = current_block() else {
		return;
	};
	let rejected = with_runtime(|rt| rt.add_teardown(block, Box::new(f)));
	// The block is already releasing its resources.
	if let Some(teardown) = rejected {
		teardown();
	}
}

/// Runs `f` without attributing tracked reads to the current block.
pub fn untrack<F, R>(f: F) -> R
where
	F: FnOnce() -> R,
{
	let _scope = ObserverScope::enter(None);
	f()
}

impl Block {
	/// Destroys the block. See [`destroy_block`].
	pub fn destroy(self) {
		destroy_block(self);
	}

	/// Whether the block exists and has not been asked to go away.
	pub fn is_alive(self) -> bool {
		with_runtime(|rt| rt.is_live(self))
	}

	/// Kind of the block, while it exists.
	pub fn kind(self) -> Option<BlockKind> {
		with_runtime(|rt| rt.block_kind(self))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Tracked, flush};
	use alloc::rc::Rc;
	use alloc::vec::Vec;
	use core::cell::RefCell;
	use rstest::rstest;
	use serial_test::serial;

	fn log() -> Rc<RefCell<Vec<&'static str>>> {
		Rc::new(RefCell::new(Vec::new()))
	}

	#[rstest]
	#[serial]
	fn test_render_runs_immediately() {
		let runs = Rc::new(RefCell::new(0));
		let block = render(
			{
				let runs = runs.clone();
				move || {
					*runs.borrow_mut() += 1;
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();

		assert_eq!(*runs.borrow(), 1);
		assert!(block.is_alive());
		assert_eq!(block.kind(), Some(BlockKind::Render));
	}

	#[rstest]
	#[serial]
	fn test_branch_is_child_of_current_block() {
		let inner = Rc::new(RefCell::new(None));
		let outer = render(
			{
				let inner = inner.clone();
				move || {
					*inner.borrow_mut() = Some(branch(|| Ok(()))?);
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();

		let inner = inner.borrow().unwrap();
		assert_eq!(inner.kind(), Some(BlockKind::Branch));
		assert_eq!(with_runtime(|rt| rt.children(outer)), alloc::vec![inner]);
	}

	#[rstest]
	#[serial]
	fn test_destroy_is_post_order_and_idempotent() {
		let order = log();
		let outer = render(
			{
				let order = order.clone();
				move || {
					let child_order = order.clone();
					branch(move || {
						let child_order = child_order.clone();
						on_cleanup(move || child_order.borrow_mut().push("child"));
						Ok(())
					})?;
					let order = order.clone();
					on_cleanup(move || order.borrow_mut().push("parent"));
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();

		destroy_block(outer);
		assert_eq!(*order.borrow(), alloc::vec!["child", "parent"]);
		assert!(!outer.is_alive());

		destroy_block(outer);
		assert_eq!(order.borrow().len(), 2);
		assert_eq!(with_runtime(|rt| rt.block_count()), 0);
	}

	#[rstest]
	#[serial]
	fn test_rerun_drops_stale_dependencies() {
		let use_a = Tracked::new(true);
		let a = Tracked::new(1);
		let b = Tracked::new(2);
		let runs = Rc::new(RefCell::new(0));

		let block = render(
			{
				let (use_a, a, b, runs) = (use_a.clone(), a.clone(), b.clone(), runs.clone());
				move || {
					*runs.borrow_mut() += 1;
					if use_a.get() {
						a.get();
					} else {
						b.get();
					}
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();
		assert_eq!(with_runtime(|rt| rt.dependency_count(block)), 2);

		use_a.set(false);
		flush().unwrap();
		assert_eq!(*runs.borrow(), 2);
		assert_eq!(with_runtime(|rt| rt.subscriber_count(a.id())), 0);

		a.set(10);
		flush().unwrap();
		assert_eq!(*runs.borrow(), 2);
	}

	#[rstest]
	#[serial]
	fn test_rerun_destroys_children_and_runs_teardowns() {
		let source = Tracked::new(0);
		let order = log();
		let children = Rc::new(RefCell::new(Vec::new()));

		render(
			{
				let (source, order, children) = (source.clone(), order.clone(), children.clone());
				move || {
					source.get();
					let order = order.clone();
					on_cleanup(move || order.borrow_mut().push("teardown"));
					children.borrow_mut().push(branch(|| Ok(()))?);
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();

		source.set(1);
		flush().unwrap();

		let children = children.borrow();
		assert_eq!(children.len(), 2);
		assert!(!children[0].is_alive());
		assert!(children[1].is_alive());
		assert_eq!(*order.borrow(), alloc::vec!["teardown"]);
	}

	#[rstest]
	#[serial]
	fn test_control_flow_rerun_keeps_branches() {
		let source = Tracked::new(0);
		let first_branch = Rc::new(RefCell::new(None));

		render(
			{
				let (source, first_branch) = (source.clone(), first_branch.clone());
				move || {
					source.get();
					if first_branch.borrow().is_none() {
						*first_branch.borrow_mut() = Some(branch(|| Ok(()))?);
					}
					Ok(())
				}
			},
			None,
			BlockKind::If,
		)
		.unwrap();

		source.set(1);
		flush().unwrap();
		assert!(first_branch.borrow().unwrap().is_alive());
	}

	#[rstest]
	#[serial]
	fn test_self_destroy_is_deferred() {
		let order = log();
		let me = Rc::new(RefCell::new(None::<Block>));
		let trigger = Tracked::new(false);

		let block = render(
			{
				let (order, me, trigger) = (order.clone(), me.clone(), trigger.clone());
				move || {
					let order_cleanup = order.clone();
					on_cleanup(move || order_cleanup.borrow_mut().push("cleanup"));
					if trigger.get() {
						if let Some(me) = *me.borrow() {
							me.destroy();
						}
						order.borrow_mut().push("after destroy call");
					}
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();
		*me.borrow_mut() = Some(block);

		trigger.set(true);
		flush().unwrap();

		assert!(!block.is_alive());
		assert_eq!(
			*order.borrow(),
			alloc::vec!["cleanup", "after destroy call", "cleanup"]
		);
	}

	#[rstest]
	#[serial]
	fn test_failed_initial_run_releases_block() {
		let result = render(
			|| {
				on_cleanup(|| {});
				Err(crate::Error::DoubleInvoke { operation: "test" })
			},
			None,
			BlockKind::Render,
		);
		assert!(result.is_err());
		assert_eq!(with_runtime(|rt| rt.block_count()), 0);
	}

	#[rstest]
	#[serial]
	fn test_untrack_skips_registration() {
		let cell = Tracked::new(1);
		let block = render(
			{
				let cell = cell.clone();
				move || {
					untrack(|| cell.get());
					Ok(())
				}
			},
			None,
			BlockKind::Render,
		)
		.unwrap();
		assert_eq!(with_runtime(|rt| rt.dependency_count(block)), 0);
	}

	#[rstest]
	#[serial]
	fn test_on_cleanup_outside_block_is_dropped() {
		let ran = Rc::new(RefCell::new(false));
		let flag = ran.clone();
		on_cleanup(move || *flag.borrow_mut() = true);
		assert!(!*ran.borrow());
	}
}
