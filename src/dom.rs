//! In-memory DOM module.

pub use rivulet_dom::*;
