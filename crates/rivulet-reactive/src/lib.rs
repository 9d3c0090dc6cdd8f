//! Rivulet Reactive - Blocks, Tracked Cells and the Flush Scheduler
//!
//! The reactive core of the rivulet UI runtime:
//!
//! - [`Tracked`]: mutable cells that record which blocks read them
//! - [`Block`]: disposable render scopes with a create / re-run / destroy
//!   lifecycle and nested child blocks
//! - [`flush`]: drains invalidated blocks in FIFO order, with a cycle guard
//!
//! All state lives in a thread-local [`Runtime`]; there is no parallel
//! mutation of the reactive graph.
//!
//! ## Example
//!
//! ```ignore
//! use rivulet_reactive::{BlockKind, flush, render, track};
//!
//! let name = track(String::from("world"));
//! render(
//!     {
//!         let name = name.clone();
//!         move || {
//!             println!("hello, {}", name.get());
//!             Ok(())
//!         }
//!     },
//!     None,
//!     BlockKind::Render,
//! )?;
//!
//! name.set(String::from("rivulet"));
//! flush()?;
//! ```

extern crate alloc;

pub mod block;
pub mod config;
pub mod error;
pub mod runtime;
pub mod scheduler;
pub mod tracked;

pub use block::{branch, current_block, destroy_block, on_cleanup, render, untrack};
pub use config::{RuntimeConfig, configure};
pub use error::{Error, HydrationError, Result};
pub use runtime::{Block, BlockKind, CellId, Runtime, RuntimeStats, with_runtime};
pub use scheduler::{clear_scheduler, flush, set_scheduler};
pub use tracked::{Tracked, track};
