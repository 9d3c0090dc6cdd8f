//! Reactive Runtime
//!
//! This module owns the reactive graph of the current thread: the arena of
//! blocks, the arena of tracked cells, the edges between them, and the queue
//! of invalidated blocks waiting for the next flush.
//!
//! ## Architecture
//!
//! 1. **Observer Stack**: Tracks the block whose render function is executing
//! 2. **Dependency Tracking**: [`Tracked::get`](crate::Tracked::get) records a
//!    cell -> block edge for the block on top of the stack
//! 3. **Invalidation Queue**: Writes push dependent blocks onto a FIFO queue,
//!    deduplicated while pending
//! 4. **Flush**: [`flush`](crate::flush) drains the queue, optionally kicked
//!    off by a microtask hook installed with [`set_scheduler`](crate::set_scheduler)
//!
//! Blocks and cells are addressed by integer handles; registration is an edge
//! in the adjacency maps below, so neither side owns the other. Nothing in
//! this module calls user code while a `RefCell` borrow is held.

use core::cell::{Cell, RefCell};
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::config::RuntimeConfig;
use crate::error::Result;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn next_id() -> usize {
	NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a tracked cell in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(usize);

impl CellId {
	pub(crate) fn new() -> Self {
		Self(next_id())
	}
}

/// Handle to a render block.
///
/// Handles stay valid after the block is destroyed; every operation on a
/// destroyed block is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(usize);

impl Block {
	pub(crate) fn next() -> Self {
		Self(next_id())
	}
}

impl fmt::Display for Block {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "block#{}", self.0)
	}
}

/// What a block renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
	/// Top-level scope created by `mount` / `hydrate`.
	Root,
	/// Plain render scope (reactive text, attributes, component bodies).
	Render,
	/// Conditional scope owning zero or one branch.
	If,
	/// List-iteration scope owning one branch per item.
	Each,
	/// One side of a conditional or one item of a list.
	Branch,
}

impl BlockKind {
	/// Control-flow blocks keep their branch children across re-runs: the
	/// controller decides which branch survives.
	pub fn preserves_branches(self) -> bool {
		matches!(self, Self::If | Self::Each)
	}
}

pub(crate) type RenderFn = Box<dyn FnMut() -> Result<()>>;
pub(crate) type Teardown = Box<dyn FnOnce()>;
pub(crate) type SchedulerFn = dyn Fn(Box<dyn FnOnce()>);

/// Arena entry for a block.
pub(crate) struct BlockNode {
	pub(crate) kind: BlockKind,
	pub(crate) parent: Option<Block>,
	pub(crate) children: Vec<Block>,
	/// Cells read during the most recent run.
	pub(crate) dependencies: Vec<CellId>,
	/// Taken out while the function executes.
	pub(crate) render: Option<RenderFn>,
	pub(crate) teardowns: Vec<Teardown>,
	pub(crate) runs: usize,
	pub(crate) running: bool,
	/// Destroy was requested while running; performed once the run returns.
	pub(crate) destroy_requested: bool,
	pub(crate) destroying: bool,
}

impl BlockNode {
	fn is_live(&self) -> bool {
		!self.destroy_requested && !self.destroying
	}
}

/// Arena entry for a cell.
#[derive(Debug, Default)]
pub(crate) struct CellNode {
	/// Blocks that read this cell during their most recent run.
	pub(crate) subscribers: Vec<Block>,
	/// Block that was rendering when the cell was created.
	pub(crate) owner: Option<Block>,
}

/// What a run needs once the arena borrow is released.
pub(crate) struct RunPlan {
	pub(crate) render: RenderFn,
	pub(crate) stale_children: Vec<Block>,
	pub(crate) teardowns: Vec<Teardown>,
}

/// Outcome of a destroy request.
pub(crate) enum DestroyPlan {
	/// Unknown or already-destroying block.
	Skip,
	/// The block is running; destruction happens after its run returns.
	Deferred,
	/// Release these resources, children first.
	Release {
		children: Vec<Block>,
		teardowns: Vec<Teardown>,
		render: Option<RenderFn>,
	},
}

/// Counters exposed for instrumentation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
	/// Blocks constructed (initial runs).
	pub blocks_created: usize,
	/// Blocks fully destroyed.
	pub blocks_destroyed: usize,
	/// Re-runs performed by flushes.
	pub reruns: usize,
}

/// Task handed to the scheduler hook.
///
/// A failed re-run aborts the flush with later blocks still queued; nobody
/// else would flush them, so another task is requested for the remainder.
fn run_scheduled_flush() {
	let _ = try_with_runtime(|rt| rt.flush_scheduled.set(false));
	if let Err(error) = crate::scheduler::flush() {
		tracing::error!(%error, "scheduled flush failed");
		let _ = try_with_runtime(|rt| {
			if rt.pending_count() > 0 {
				rt.request_flush();
			}
		});
	}
}

/// Reactive runtime of one thread.
pub struct Runtime {
	/// `None` entries come from `untrack`.
	observer_stack: RefCell<Vec<Option<Block>>>,
	pub(crate) blocks: RefCell<BTreeMap<Block, BlockNode>>,
	pub(crate) cells: RefCell<BTreeMap<CellId, CellNode>>,
	pub(crate) pending: RefCell<VecDeque<Block>>,
	pub(crate) flushing: Cell<bool>,
	pub(crate) flush_scheduled: Cell<bool>,
	pub(crate) scheduler: RefCell<Option<Rc<SchedulerFn>>>,
	config: RefCell<RuntimeConfig>,
	stats: Cell<RuntimeStats>,
}

impl Runtime {
	/// Creates an empty runtime.
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			blocks: RefCell::new(BTreeMap::new()),
			cells: RefCell::new(BTreeMap::new()),
			pending: RefCell::new(VecDeque::new()),
			flushing: Cell::new(false),
			flush_scheduled: Cell::new(false),
			scheduler: RefCell::new(None),
			config: RefCell::new(RuntimeConfig::default()),
			stats: Cell::new(RuntimeStats::default()),
		}
	}

	/// The block whose render function is executing, unless tracking is
	/// suspended with [`untrack`](crate::untrack).
	pub fn current_observer(&self) -> Option<Block> {
		self.observer_stack.borrow().last().copied().flatten()
	}

	/// Whether any render function is executing on this thread.
	pub fn is_rendering(&self) -> bool {
		self.observer_stack.borrow().iter().any(Option::is_some)
	}

	pub(crate) fn push_observer(&self, observer: Option<Block>) {
		self.observer_stack.borrow_mut().push(observer);
	}

	pub(crate) fn pop_observer(&self) -> Option<Option<Block>> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Whether `block` exists and is neither destroyed nor being destroyed.
	pub fn is_live(&self, block: Block) -> bool {
		self.blocks
			.borrow()
			.get(&block)
			.is_some_and(BlockNode::is_live)
	}

	/// Records that the current observer read `cell`. Registering twice is a
	/// no-op.
	pub fn track_dependency(&self, cell: CellId) {
		let Some(observer) = self.current_observer() else {
			return;
		};
		let mut blocks = self.blocks.borrow_mut();
		let Some(node) = blocks.get_mut(&observer).filter(|node| node.is_live()) else {
			return;
		};
		if !node.dependencies.contains(&cell) {
			node.dependencies.push(cell);
		}

		let mut cells = self.cells.borrow_mut();
		let cell_node = cells.entry(cell).or_default();
		if !cell_node.subscribers.contains(&observer) {
			cell_node.subscribers.push(observer);
			tracing::trace!(%observer, ?cell, "dependency registered");
		}
	}

	pub(crate) fn register_cell(&self, cell: CellId) {
		let owner = self.current_observer();
		self.cells.borrow_mut().insert(
			cell,
			CellNode {
				subscribers: Vec::new(),
				owner,
			},
		);
	}

	/// A write is stale when it comes from the render pass of a dead block,
	/// or targets a cell whose owning block is gone.
	pub(crate) fn is_stale_write(&self, cell: CellId) -> bool {
		if let Some(observer) = self.current_observer()
			&& !self.is_live(observer)
		{
			return true;
		}
		let owner = self.cells.borrow().get(&cell).and_then(|node| node.owner);
		owner.is_some_and(|owner| !self.is_live(owner))
	}

	/// Invalidates every block that read `cell` during its last run.
	pub fn notify_cell_change(&self, cell: CellId) {
		let subscribers = match self.cells.borrow().get(&cell) {
			Some(node) => node.subscribers.clone(),
			None => return,
		};
		for block in subscribers {
			self.schedule_update(block);
		}
	}

	/// Queues `block` for the next flush unless it is already pending.
	pub fn schedule_update(&self, block: Block) {
		{
			let mut pending = self.pending.borrow_mut();
			if pending.contains(&block) {
				return;
			}
			pending.push_back(block);
		}
		self.request_flush();
	}

	/// Hands a flush task to the scheduler hook unless one is already queued
	/// or a flush is running. Without a hook, updates must be flushed
	/// manually.
	pub(crate) fn request_flush(&self) {
		if self.flushing.get() || self.flush_scheduled.get() {
			return;
		}
		let scheduler = self.scheduler.borrow().clone();
		if let Some(scheduler) = scheduler {
			self.flush_scheduled.set(true);
			scheduler(Box::new(run_scheduled_flush));
		}
	}

	/// Number of blocks waiting for a flush.
	pub fn pending_count(&self) -> usize {
		self.pending.borrow().len()
	}

	pub(crate) fn pop_pending(&self) -> Option<Block> {
		self.pending.borrow_mut().pop_front()
	}

	pub(crate) fn clear_pending(&self) {
		self.pending.borrow_mut().clear();
	}

	/// Drops every edge from `block` to the cells it read.
	pub fn clear_dependencies(&self, block: Block) {
		let dependencies = match self.blocks.borrow_mut().get_mut(&block) {
			Some(node) => core::mem::take(&mut node.dependencies),
			None => return,
		};
		let mut cells = self.cells.borrow_mut();
		for cell in dependencies {
			if let Some(cell_node) = cells.get_mut(&cell) {
				cell_node.subscribers.retain(|&id| id != block);
			}
		}
	}

	/// Removes a cell and every edge pointing at it.
	pub(crate) fn remove_cell(&self, cell: CellId) {
		let Some(node) = self.cells.borrow_mut().remove(&cell) else {
			return;
		};
		let mut blocks = self.blocks.borrow_mut();
		for block in node.subscribers {
			if let Some(block_node) = blocks.get_mut(&block) {
				block_node.dependencies.retain(|&id| id != cell);
			}
		}
	}

	pub(crate) fn insert_block(
		&self,
		block: Block,
		parent: Option<Block>,
		kind: BlockKind,
		render: RenderFn,
	) {
		let mut blocks = self.blocks.borrow_mut();
		let parent = parent.filter(|parent| blocks.contains_key(parent));
		if let Some(parent) = parent
			&& let Some(parent_node) = blocks.get_mut(&parent)
		{
			parent_node.children.push(block);
		}
		blocks.insert(
			block,
			BlockNode {
				kind,
				parent,
				children: Vec::new(),
				dependencies: Vec::new(),
				render: Some(render),
				teardowns: Vec::new(),
				runs: 0,
				running: false,
				destroy_requested: false,
				destroying: false,
			},
		);
		self.bump(|stats| stats.blocks_created += 1);
	}

	/// Takes what a run of `block` needs: its function, the children and
	/// teardowns left over from the previous run. Drops the old dependency
	/// set so the run registers a fresh one.
	pub(crate) fn prepare_run(&self, block: Block) -> Option<RunPlan> {
		let (render, children, teardowns, kind, rerun) = {
			let mut blocks = self.blocks.borrow_mut();
			let node = blocks.get_mut(&block)?;
			if node.running || !node.is_live() {
				return None;
			}
			let render = node.render.take()?;
			node.running = true;
			node.runs += 1;
			(
				render,
				core::mem::take(&mut node.children),
				core::mem::take(&mut node.teardowns),
				node.kind,
				node.runs > 1,
			)
		};
		if rerun {
			self.bump(|stats| stats.reruns += 1);
		}
		self.clear_dependencies(block);

		let mut stale_children = Vec::new();
		if kind.preserves_branches() {
			let mut kept = Vec::new();
			let blocks = self.blocks.borrow();
			for child in children {
				match blocks.get(&child).map(|node| node.kind) {
					Some(BlockKind::Branch) => kept.push(child),
					Some(_) => stale_children.push(child),
					None => {}
				}
			}
			drop(blocks);
			if let Some(node) = self.blocks.borrow_mut().get_mut(&block) {
				node.children = kept;
			}
		} else {
			stale_children = children;
		}

		Some(RunPlan {
			render,
			stale_children,
			teardowns,
		})
	}

	/// Puts the render function back. Returns `true` when a destroy was
	/// requested during the run.
	pub(crate) fn finish_run(&self, block: Block, render: RenderFn) -> (bool, Option<RenderFn>) {
		let mut blocks = self.blocks.borrow_mut();
		match blocks.get_mut(&block) {
			Some(node) => {
				node.running = false;
				node.render = Some(render);
				(node.destroy_requested, None)
			}
			None => (false, Some(render)),
		}
	}

	pub(crate) fn begin_destroy(&self, block: Block) -> DestroyPlan {
		let mut blocks = self.blocks.borrow_mut();
		let Some(node) = blocks.get_mut(&block) else {
			return DestroyPlan::Skip;
		};
		if node.destroying {
			return DestroyPlan::Skip;
		}
		if node.running {
			node.destroy_requested = true;
			return DestroyPlan::Deferred;
		}
		node.destroying = true;
		DestroyPlan::Release {
			children: core::mem::take(&mut node.children),
			teardowns: core::mem::take(&mut node.teardowns),
			render: node.render.take(),
		}
	}

	pub(crate) fn finish_destroy(&self, block: Block) {
		self.clear_dependencies(block);
		let parent = match self.blocks.borrow_mut().remove(&block) {
			Some(node) => node.parent,
			None => return,
		};
		if let Some(parent) = parent
			&& let Some(parent_node) = self.blocks.borrow_mut().get_mut(&parent)
		{
			parent_node.children.retain(|&child| child != block);
		}
		self.pending.borrow_mut().retain(|&pending| pending != block);
		self.bump(|stats| stats.blocks_destroyed += 1);
	}

	/// Registers a teardown on `block`. Returns the teardown back when the
	/// block cannot accept it any more.
	pub(crate) fn add_teardown(&self, block: Block, teardown: Teardown) -> Option<Teardown> {
		match self.blocks.borrow_mut().get_mut(&block) {
			Some(node) if !node.destroying => {
				node.teardowns.push(teardown);
				None
			}
			_ => Some(teardown),
		}
	}

	/// Whether `block` is still present in the arena.
	pub fn has_block(&self, block: Block) -> bool {
		self.blocks.borrow().contains_key(&block)
	}

	/// Kind of `block`, if it still exists.
	pub fn block_kind(&self, block: Block) -> Option<BlockKind> {
		self.blocks.borrow().get(&block).map(|node| node.kind)
	}

	/// Children of `block` in creation order.
	pub fn children(&self, block: Block) -> Vec<Block> {
		self.blocks
			.borrow()
			.get(&block)
			.map(|node| node.children.clone())
			.unwrap_or_default()
	}

	/// Number of live blocks in the arena.
	pub fn block_count(&self) -> usize {
		self.blocks.borrow().len()
	}

	/// Number of blocks subscribed to `cell` (for testing).
	pub fn subscriber_count(&self, cell: CellId) -> usize {
		self.cells
			.borrow()
			.get(&cell)
			.map(|node| node.subscribers.len())
			.unwrap_or(0)
	}

	/// Number of cells `block` read during its last run (for testing).
	pub fn dependency_count(&self, block: Block) -> usize {
		self.blocks
			.borrow()
			.get(&block)
			.map(|node| node.dependencies.len())
			.unwrap_or(0)
	}

	/// Whether `cell` is still registered in the graph.
	pub fn has_cell(&self, cell: CellId) -> bool {
		self.cells.borrow().contains_key(&cell)
	}

	/// Snapshot of the instrumentation counters.
	pub fn stats(&self) -> RuntimeStats {
		self.stats.get()
	}

	fn bump(&self, f: impl FnOnce(&mut RuntimeStats)) {
		let mut stats = self.stats.get();
		f(&mut stats);
		self.stats.set(stats);
	}

	/// Current configuration.
	pub fn config(&self) -> RuntimeConfig {
		self.config.borrow().clone()
	}

	pub(crate) fn set_config(&self, config: RuntimeConfig) {
		*self.config.borrow_mut() = config;
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

// One runtime per thread. In WASM there is only one thread, so this is
// effectively the global runtime.
thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Runs `f` against the runtime of the current thread.
///
/// ```ignore
/// use rivulet_reactive::with_runtime;
///
/// let pending = with_runtime(|rt| rt.pending_count());
/// ```
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Like [`with_runtime`], but returns `None` once thread-local storage is
/// torn down. Used from `Drop` implementations.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}

/// Keeps an observer on the stack for its lifetime; popping happens on every
/// exit path, including unwinding.
pub(crate) struct ObserverScope(());

impl ObserverScope {
	pub(crate) fn enter(observer: Option<Block>) -> Self {
		with_runtime(|rt| rt.push_observer(observer));
		Self(())
	}
}

impl Drop for ObserverScope {
	fn drop(&mut self) {
		let _ = try_with_runtime(|rt| rt.pop_observer());
	}
}
