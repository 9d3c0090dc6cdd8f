//! Control flow, server rendering and hydration.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rivulet::pages::{render_to_string, hydrate, if_block, element};
//!
//! let html = render_to_string(|out| {
//!     out.block_start();
//!     out.open("div", &[("class", "a")]).close();
//!     out.block_end();
//! });
//! ```

// Re-export all rivulet-pages functionality
pub use rivulet_pages::*;
