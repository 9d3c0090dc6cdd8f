//! Flush scheduling.
//!
//! Writes only queue invalidated blocks. A flush drains the queue in FIFO
//! order, re-running each block at most once per pass through the queue;
//! blocks invalidated while the flush is running are appended and drained by
//! the same flush. A block that re-runs more than
//! [`RuntimeConfig::max_reruns_per_flush`](crate::RuntimeConfig) times in one
//! flush aborts it with [`Error::InvalidationCycle`].

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;

use crate::block::run_block;
use crate::error::{Error, Result};
use crate::runtime::{Block, SchedulerFn, try_with_runtime, with_runtime};

/// Installs the hook used to defer flushes to a microtask.
///
/// The hook receives a task that performs the flush. In a browser this would
/// typically be `wasm_bindgen_futures::spawn_local`; tests can run the task
/// inline. Without a hook, updates stay queued until [`flush`] is called.
///
/// ```ignore
/// rivulet_reactive::set_scheduler(|task| {
///     wasm_bindgen_futures::spawn_local(async move { task() });
/// });
/// ```
pub fn set_scheduler<F>(scheduler: F)
where
	F: Fn(Box<dyn FnOnce()>) + 'static,
{
	let scheduler: Rc<SchedulerFn> = Rc::new(scheduler);
	with_runtime(|rt| *rt.scheduler.borrow_mut() = Some(scheduler));
}

/// Removes the microtask hook; flushing becomes manual again.
pub fn clear_scheduler() {
	with_runtime(|rt| *rt.scheduler.borrow_mut() = None);
}

/// Marks the runtime as flushing for its lifetime.
struct FlushGuard(());

impl FlushGuard {
	fn enter() -> Self {
		with_runtime(|rt| {
			rt.flushing.set(true);
			rt.flush_scheduled.set(false);
		});
		Self(())
	}
}

impl Drop for FlushGuard {
	fn drop(&mut self) {
		let _ = try_with_runtime(|rt| rt.flushing.set(false));
	}
}

/// Synchronously re-runs every invalidated block, including blocks
/// invalidated by earlier re-runs of this same flush.
///
/// Called while a flush is already in progress, or from inside a render
/// function, this returns immediately: the pending work is drained by the
/// flush in progress (or the next one) instead of a nested flush.
pub fn flush() -> Result<()> {
	let busy = with_runtime(|rt| rt.flushing.get() || rt.is_rendering());
	if busy {
		return Ok(());
	}

	let _guard = FlushGuard::enter();
	let limit = with_runtime(|rt| rt.config().max_reruns_per_flush);
	let mut runs: BTreeMap<Block, usize> = BTreeMap::new();
	let mut total = 0usize;

	tracing::debug!(pending = with_runtime(|rt| rt.pending_count()), "flush started");
	while let Some(block) = with_runtime(|rt| rt.pop_pending()) {
		if !with_runtime(|rt| rt.is_live(block)) {
			continue;
		}

		let count = runs.entry(block).or_insert(0);
		*count += 1;
		let count = *count;
		if count > limit {
			with_runtime(|rt| rt.clear_pending());
			tracing::error!(%block, limit, "invalidation cycle detected");
			return Err(Error::InvalidationCycle {
				block,
				reruns: limit,
			});
		}

		tracing::trace!(%block, "re-running block");
		run_block(block)?;
		total += 1;
	}
	tracing::debug!(reruns = total, "flush finished");
	Ok(())
}
