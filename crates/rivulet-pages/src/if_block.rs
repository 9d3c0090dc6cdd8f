//! Reactive conditional rendering.
//!
//! [`if_block`] owns zero or one branch block. Its render function selects a
//! branch through a [`BranchSlot`]; the controller compares the selector
//! with the one it committed last and only then swaps branches:
//!
//! ```text
//!              selector changed, render given
//!   no-branch ------------------------------> branch-mounted
//!       ^                                           |
//!       +-------------------------------------------+
//!           selector changed (old branch destroyed first)
//! ```
//!
//! The committed selector starts out uninitialized, so the first evaluation
//! always commits, even when it selects nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rivulet_reactive::{Block, BlockKind, Error, Result, branch, destroy_block, render};

use crate::client::{Anchor, Region};

/// Render function of one branch. It may run again if it reads tracked cells
/// itself.
pub type BranchFn = Box<dyn FnMut(&Anchor) -> Result<()>>;

/// The branch chosen by one evaluation of an `if` block.
pub enum Branch<K> {
	/// Nothing is rendered (selector `null`).
	None,
	/// Render `render` for `selector`.
	Selected { selector: K, render: BranchFn },
}

impl<K> Branch<K> {
	/// Selector of this branch; `None` for [`Branch::None`].
	pub fn selector(&self) -> Option<&K> {
		match self {
			Self::None => None,
			Self::Selected { selector, .. } => Some(selector),
		}
	}
}

impl<K: fmt::Debug> fmt::Debug for Branch<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::None => f.write_str("Branch::None"),
			Self::Selected { selector, .. } => f
				.debug_struct("Branch::Selected")
				.field("selector", selector)
				.finish_non_exhaustive(),
		}
	}
}

/// Collects the branch selected during one evaluation.
pub struct BranchSlot<K> {
	branch: Branch<K>,
}

impl<K> BranchSlot<K> {
	fn new() -> Self {
		Self {
			branch: Branch::None,
		}
	}

	/// Selects `render` for `selector`.
	///
	/// # Errors
	///
	/// [`Error::DoubleInvoke`] when a branch was already selected during this
	/// evaluation.
	pub fn set<F>(&mut self, selector: K, render: F) -> Result<()>
	where
		F: FnMut(&Anchor) -> Result<()> + 'static,
	{
		if matches!(self.branch, Branch::Selected { .. }) {
			return Err(Error::DoubleInvoke {
				operation: "BranchSlot::set",
			});
		}
		self.branch = Branch::Selected {
			selector,
			render: Box::new(render),
		};
		Ok(())
	}

	fn into_branch(self) -> Branch<K> {
		self.branch
	}
}

struct BranchState<K> {
	/// `None` until the first evaluation commits.
	committed: Option<Option<K>>,
	mounted: Option<Block>,
}

/// Renders at most one branch selected by `select`, at `anchor`.
///
/// `select` runs inside the `if` block, so every tracked read it performs
/// re-evaluates the selection. When hydrating, the region must be delimited
/// by a marker pair in the server output.
///
/// ```ignore
/// if_block(&anchor, move |slot| {
///     if logged_in.get() {
///         slot.set(true, |anchor| text(anchor, "welcome back").map(drop))?;
///     } else {
///         slot.set(false, |anchor| text(anchor, "please sign in").map(drop))?;
///     }
///     Ok(())
/// })?;
/// ```
pub fn if_block<K, F>(anchor: &Anchor, mut select: F) -> Result<Block>
where
	K: PartialEq + 'static,
	F: FnMut(&mut BranchSlot<K>) -> Result<()> + 'static,
{
	let region = Region::open(anchor, false)?;
	let inner = region.inner();
	let state = Rc::new(RefCell::new(BranchState {
		committed: None,
		mounted: None,
	}));

	let block = render(
		move || {
			let mut slot = BranchSlot::new();
			select(&mut slot)?;
			update_branch(&state, &inner, slot.into_branch())
		},
		None,
		BlockKind::If,
	)?;
	region.close()?;
	Ok(block)
}

fn update_branch<K: PartialEq>(
	state: &Rc<RefCell<BranchState<K>>>,
	anchor: &Anchor,
	next: Branch<K>,
) -> Result<()> {
	let unchanged = matches!(
		&state.borrow().committed,
		Some(committed) if committed.as_ref() == next.selector()
	);
	if unchanged {
		return Ok(());
	}

	let previous = state.borrow_mut().mounted.take();
	if let Some(previous) = previous {
		destroy_block(previous);
	}

	let (selector, render_fn) = match next {
		Branch::None => (None, None),
		Branch::Selected { selector, render } => (Some(selector), Some(render)),
	};
	let Some(mut render_fn) = render_fn else {
		state.borrow_mut().committed = Some(None);
		return Ok(());
	};

	// Back to uninitialized until the branch is mounted, so a failed mount is
	// retried by the next evaluation whatever it selects.
	state.borrow_mut().committed = None;
	let anchor = anchor.clone();
	let mounted = branch(move || render_fn(&anchor))?;
	let mut state = state.borrow_mut();
	state.committed = Some(selector);
	state.mounted = Some(mounted);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::text;
	use rivulet_dom::{Document, Node};
	use rivulet_reactive::{Tracked, flush, with_runtime};
	use rstest::rstest;
	use serial_test::serial;

	fn container() -> Node {
		Document::new().create_element("div")
	}

	#[rstest]
	#[serial]
	fn test_switches_branches() {
		let root = container();
		let flag = Tracked::new(true);
		let source = flag.clone();
		if_block(&Anchor::append_to(&root), move |slot| {
			if source.get() {
				slot.set(true, |anchor| text(anchor, "yes").map(drop))?;
			} else {
				slot.set(false, |anchor| text(anchor, "no").map(drop))?;
			}
			Ok(())
		})
		.unwrap();
		assert_eq!(root.inner_html(), "yes<!---->");

		flag.set(false);
		flush().unwrap();
		assert_eq!(root.inner_html(), "no<!---->");
	}

	#[rstest]
	#[serial]
	fn test_no_set_means_no_branch() {
		let root = container();
		let flag = Tracked::new(true);
		let source = flag.clone();
		let block = if_block(&Anchor::append_to(&root), move |slot| {
			if source.get() {
				slot.set((), |anchor| text(anchor, "shown").map(drop))?;
			}
			Ok(())
		})
		.unwrap();
		assert_eq!(with_runtime(|rt| rt.children(block)).len(), 1);

		flag.set(false);
		flush().unwrap();
		assert_eq!(root.inner_html(), "<!---->");
		assert!(with_runtime(|rt| rt.children(block)).is_empty());
	}

	#[rstest]
	#[serial]
	fn test_same_selector_keeps_branch() {
		let root = container();
		let tick = Tracked::new(0);
		let source = tick.clone();
		let block = if_block(&Anchor::append_to(&root), move |slot| {
			source.get();
			slot.set("only", |anchor| text(anchor, "stable").map(drop))?;
			Ok(())
		})
		.unwrap();
		let before = with_runtime(|rt| rt.stats());
		let branch = with_runtime(|rt| rt.children(block));

		tick.set(1);
		flush().unwrap();
		tick.set(2);
		flush().unwrap();

		let after = with_runtime(|rt| rt.stats());
		assert_eq!(after.blocks_created, before.blocks_created);
		assert_eq!(after.blocks_destroyed, before.blocks_destroyed);
		assert_eq!(after.reruns, before.reruns + 2);
		assert_eq!(with_runtime(|rt| rt.children(block)), branch);
	}

	#[rstest]
	#[serial]
	fn test_failed_branch_is_retried() {
		let root = container();
		let selector = Tracked::new(0);
		let tick = Tracked::new(0);
		let broken = Rc::new(std::cell::Cell::new(false));
		let (source, ticks, fails) = (selector.clone(), tick.clone(), broken.clone());
		let block = if_block(&Anchor::append_to(&root), move |slot| {
			ticks.get();
			let selected = source.get();
			let fails = fails.clone();
			slot.set(selected, move |anchor| {
				if fails.get() {
					return Err(Error::DoubleInvoke {
						operation: "broken branch",
					});
				}
				text(anchor, &selected.to_string())?;
				Ok(())
			})
		})
		.unwrap();
		assert_eq!(root.inner_html(), "0<!---->");

		broken.set(true);
		selector.set(1);
		assert!(flush().is_err());
		assert_eq!(root.inner_html(), "<!---->");
		assert!(with_runtime(|rt| rt.children(block)).is_empty());

		broken.set(false);
		tick.set(1);
		flush().unwrap();
		assert_eq!(root.inner_html(), "1<!---->");
		assert_eq!(with_runtime(|rt| rt.children(block)).len(), 1);
	}

	#[rstest]
	#[serial]
	fn test_toggling_does_not_grow_document() {
		let root = container();
		let flag = Tracked::new(true);
		let source = flag.clone();
		if_block(&Anchor::append_to(&root), move |slot| {
			if source.get() {
				slot.set(true, |anchor| text(anchor, "on").map(drop))?;
			}
			Ok(())
		})
		.unwrap();
		let live = root.document().live_nodes();

		for round in 0..1000 {
			flag.set(round % 2 == 1);
			flush().unwrap();
		}
		assert_eq!(root.inner_html(), "on<!---->");
		assert_eq!(root.document().live_nodes(), live);
	}

	#[rstest]
	#[serial]
	fn test_double_set_is_rejected() {
		let root = container();
		let err = if_block(&Anchor::append_to(&root), |slot| {
			slot.set(1, |_| Ok(()))?;
			slot.set(2, |_| Ok(()))?;
			Ok(())
		})
		.unwrap_err();
		assert_eq!(
			err,
			Error::DoubleInvoke {
				operation: "BranchSlot::set"
			}
		);
		assert_eq!(with_runtime(|rt| rt.block_count()), 0);
	}

	#[rstest]
	#[serial]
	fn test_old_branch_destroyed_before_new_mounts() {
		let root = container();
		let log = Rc::new(RefCell::new(Vec::new()));
		let which = Tracked::new(0);
		let (source, events) = (which.clone(), log.clone());
		if_block(&Anchor::append_to(&root), move |slot| {
			let selected = source.get();
			let events = events.clone();
			slot.set(selected, move |_| {
				events.borrow_mut().push(format!("mount {}", selected));
				let events = events.clone();
				rivulet_reactive::on_cleanup(move || {
					events.borrow_mut().push(format!("unmount {}", selected))
				});
				Ok(())
			})?;
			Ok(())
		})
		.unwrap();

		which.set(1);
		flush().unwrap();
		assert_eq!(*log.borrow(), vec!["mount 0", "unmount 0", "mount 1"]);
	}

	#[rstest]
	fn test_branch_debug() {
		let branch: Branch<u8> = Branch::Selected {
			selector: 3,
			render: Box::new(|_| Ok(())),
		};
		assert_eq!(format!("{:?}", branch), "Branch::Selected { selector: 3, .. }");
		assert_eq!(branch.selector(), Some(&3));
		assert_eq!(format!("{:?}", Branch::<u8>::None), "Branch::None");
	}
}
