//! # Rivulet
//!
//! A fine-grained reactive UI runtime with server rendering and marker-based
//! hydration.
//!
//! Render functions read [`Tracked`] cells inside blocks; writing a cell
//! re-runs exactly the blocks that read it on the next [`flush`]. The same
//! render functions either create DOM nodes ([`pages::mount`]) or adopt the
//! nodes of server-rendered HTML ([`pages::hydrate`]).
//!
//! ## Feature Flags
//!
//! The reactive core is always available; build with
//! `default-features = false` for the core alone.
//!
//! - `dom` - In-memory DOM tree with HTML parsing and serialization
//! - `pages` - Control flow, SSR writer and hydration (implies `dom`)
//! - `full` (default) - Everything
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rivulet::prelude::*;
//!
//! let count = Tracked::new(0);
//! let source = count.clone();
//! let root = mount(&target, move |anchor| {
//!     let source = source.clone();
//!     reactive_text(anchor, move || source.get().to_string())?;
//!     Ok(())
//! })?;
//!
//! count.set(1);
//! flush()?;
//! ```

pub mod config;
#[cfg(feature = "dom")]
pub mod dom;
#[cfg(feature = "pages")]
pub mod pages;
pub mod reactive;

pub use config::{Config, ConfigError};

// Re-export the reactive core
pub use rivulet_reactive::{
	Block, BlockKind, Error, HydrationError, Result, RuntimeConfig, Tracked, destroy_block, flush,
	on_cleanup, track, untrack, with_runtime,
};

/// Commonly used items.
pub mod prelude {
	pub use rivulet_reactive::{
		Block, Error, Result, Tracked, flush, on_cleanup, set_scheduler, track, untrack,
	};

	#[cfg(feature = "dom")]
	pub use rivulet_dom::{Document, Node};

	#[cfg(feature = "pages")]
	pub use rivulet_pages::{
		Anchor, ServerOutput, each_block, element, hydrate, if_block, mount, reactive_attr,
		reactive_text, render_to_string, text,
	};

	pub use crate::config::Config;
}
