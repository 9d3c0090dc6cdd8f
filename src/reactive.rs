//! Reactive core module.
//!
//! Tracked cells, render blocks and the flush scheduler.
//!
//! # Examples
//!
//! ```rust,ignore
//! use rivulet::reactive::{Tracked, flush, render, BlockKind};
//!
//! let name = Tracked::new("world".to_string());
//! let source = name.clone();
//! render(move || {
//!     println!("hello {}", source.get());
//!     Ok(())
//! }, None, BlockKind::Render)?;
//!
//! name.set("rivulet".to_string());
//! flush()?;
//! ```

pub use rivulet_reactive::*;
