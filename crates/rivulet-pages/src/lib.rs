//! Rivulet Pages - Control Flow, Server Rendering and Hydration
//!
//! This crate turns render functions into live DOM on top of
//! [`rivulet_reactive`] blocks:
//!
//! - **Client primitives** ([`client`]): text, elements, reactive text and
//!   attributes, inserted at an [`Anchor`]
//! - **Control flow**: [`if_block`] (zero or one branch) and [`each_block`]
//!   (keyed list)
//! - **SSR** ([`ssr`]): a [`ServerOutput`] writer producing marker-annotated
//!   HTML
//! - **Hydration** ([`hydration`]): a cursor-based walker that binds the same
//!   render functions to server-rendered nodes instead of creating new ones
//!
//! ## Architecture
//!
//! ```text
//! Server:  render_to_string(|out| ...)  ->  "<!--[--><div>..</div><!--]-->"
//!                                                 |
//! Client:  hydrate(&target, |anchor| ...)  <------+
//!            claims nodes through the cursor, then ordinary
//!            Tracked -> Block -> flush updates take over
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use rivulet_pages::{Anchor, element, hydrate, if_block, text};
//! use rivulet_reactive::{Tracked, flush};
//!
//! let open = Tracked::new(true);
//! let source = open.clone();
//! let root = hydrate(&target, move |anchor: &Anchor| {
//!     let source = source.clone();
//!     if_block(anchor, move |slot| {
//!         if source.get() {
//!             slot.set(true, |anchor| {
//!                 element(anchor, "div", &[("class", "a")], |_| Ok(()))?;
//!                 Ok(())
//!             })?;
//!         }
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! open.set(false);
//! flush()?;
//! ```

pub mod client;
pub mod each_block;
pub mod hydration;
pub mod if_block;
pub mod markers;
pub mod root;
pub mod ssr;

pub use client::{Anchor, element, reactive_attr, reactive_text, text};
pub use each_block::each_block;
pub use hydration::{
	HydrationOptions, HydrationPass, advance_cursor, find_matching_end, hydrate_node, is_hydrating,
	set_hydrate_node,
};
pub use if_block::{Branch, BranchFn, BranchSlot, if_block};
pub use markers::Marker;
pub use root::{Root, hydrate, hydrate_with, mount};
pub use ssr::{ServerOutput, render_to_string};
