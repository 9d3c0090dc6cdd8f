//! Rivulet DOM - An In-Memory Document Tree
//!
//! A small DOM-like tree used as the rendering target of the rivulet runtime,
//! both for client-side mounting in tests and native hosts, and as the parsed
//! form of server output during hydration.
//!
//! ## Features
//!
//! - **Handles**: [`Document`] and [`Node`] are cheap, cloneable handles into
//!   a shared `slotmap` arena; node equality is identity. Detached nodes no
//!   handle refers to are freed.
//! - **Mutation**: element, text, comment and fragment creation, insertion,
//!   detaching, attributes and character data.
//! - **HTML**: [`Node::set_inner_html`] parses a fragment with `scraper`;
//!   [`Node::inner_html`] / [`Node::outer_html`] serialize with escaping.
//! - **Instrumentation**: [`Document::nodes_created`] counts nodes created
//!   through the creation API; [`Document::live_nodes`] counts what is
//!   stored.
//!
//! ## Example
//!
//! ```ignore
//! use rivulet_dom::Document;
//!
//! let doc = Document::new();
//! let root = doc.create_element("div");
//! root.set_inner_html("<p class=\"greeting\">hello</p>");
//! assert_eq!(root.outer_html(), "<div><p class=\"greeting\">hello</p></div>");
//! ```

mod document;
mod html;
mod node;

pub use document::Document;
pub use html::is_void_element;
pub use node::{Node, NodeKind};
