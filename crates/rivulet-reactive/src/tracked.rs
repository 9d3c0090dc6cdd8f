//! Tracked - Reactive Storage Cells
//!
//! `Tracked<T>` holds a value and records which blocks read it.
//!
//! ## Key Features
//!
//! - **Automatic Dependency Tracking**: `get()` / `with()` inside a block's
//!   render function register that block as a dependent.
//! - **Change Notification**: `set()` invalidates every dependent block;
//!   writing an equal value does nothing.
//! - **Cheap Handles**: a `Tracked<T>` is an id plus a shared value; clones
//!   refer to the same cell.
//! - **Teardown Races**: writes from a destroyed block, or to a cell owned by
//!   a destroyed block, are dropped silently.
//!
//! ## Example
//!
//! ```ignore
//! use rivulet_reactive::track;
//!
//! let count = track(0);
//! assert_eq!(count.get(), 0);
//!
//! count.set(42);
//! count.update(|n| *n += 1);
//! assert_eq!(count.get_untracked(), 43);
//! ```

use core::cell::RefCell;
use core::fmt;

use alloc::rc::Rc;

use crate::runtime::{CellId, try_with_runtime, with_runtime};

/// A reactive cell.
pub struct Tracked<T: 'static> {
	id: CellId,
	value: Rc<RefCell<T>>,
}

/// Creates a new [`Tracked`] cell holding `initial`.
pub fn track<T: 'static>(initial: T) -> Tracked<T> {
	Tracked::new(initial)
}

impl<T: 'static> Tracked<T> {
	/// Creates a new cell. When created inside a render function the cell is
	/// owned by the rendering block.
	pub fn new(value: T) -> Self {
		let id = CellId::new();
		with_runtime(|rt| rt.register_cell(id));
		Self {
			id,
			value: Rc::new(RefCell::new(value)),
		}
	}

	/// Returns the current value, registering the rendering block as a
	/// dependent.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		with_runtime(|rt| rt.track_dependency(self.id));
		self.get_untracked()
	}

	/// Borrows the current value, registering the rendering block as a
	/// dependent.
	///
	/// Writing to the same cell from inside `f` panics.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		with_runtime(|rt| rt.track_dependency(self.id));
		f(&self.value.borrow())
	}

	/// Returns the current value without registering a dependency.
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Replaces the value. Equal values are a no-op; otherwise every dependent
	/// block is invalidated.
	pub fn set(&self, value: T)
	where
		T: PartialEq,
	{
		if self.is_stale() {
			return;
		}
		if *self.value.borrow() == value {
			return;
		}
		*self.value.borrow_mut() = value;
		with_runtime(|rt| rt.notify_cell_change(self.id));
	}

	/// Mutates the value in place and always invalidates dependents.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		if self.is_stale() {
			return;
		}
		f(&mut self.value.borrow_mut());
		with_runtime(|rt| rt.notify_cell_change(self.id));
	}

	/// Id of this cell in the dependency graph.
	pub fn id(&self) -> CellId {
		self.id
	}

	fn is_stale(&self) -> bool {
		let stale = with_runtime(|rt| rt.is_stale_write(self.id));
		if stale {
			tracing::debug!(cell = ?self.id, "stale write dropped");
		}
		stale
	}
}

impl<T: 'static> Clone for Tracked<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			value: self.value.clone(),
		}
	}
}

impl<T: 'static> Drop for Tracked<T> {
	fn drop(&mut self) {
		// Only the last handle removes the cell from the graph.
		if Rc::strong_count(&self.value) == 1 {
			let _ = try_with_runtime(|rt| rt.remove_cell(self.id));
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Tracked<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tracked")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.finish()
	}
}
