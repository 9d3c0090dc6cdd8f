//! Server-side output writer.
//!
//! [`ServerOutput`] produces the HTML the client primitives expect to find
//! when hydrating: the same elements and texts, every dynamic region wrapped
//! in a marker pair, and an empty comment between two adjacent texts so the
//! browser does not merge them into one text node.

use rivulet_dom::is_void_element;

use crate::markers::Marker;

/// HTML writer mirroring the client primitives.
#[derive(Debug, Default)]
pub struct ServerOutput {
	html: String,
	open_elements: Vec<String>,
	last_was_text: bool,
}

impl ServerOutput {
	/// Creates an empty writer.
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens an element. Void elements are closed by the matching
	/// [`close`](Self::close) without emitting an end tag.
	pub fn open(&mut self, tag: &str, attributes: &[(&str, &str)]) -> &mut Self {
		let tag = tag.to_ascii_lowercase();
		self.html.push('<');
		self.html.push_str(&tag);
		for (name, value) in attributes {
			self.html.push(' ');
			self.html.push_str(name);
			self.html.push_str("=\"");
			self.html
				.push_str(&html_escape::encode_double_quoted_attribute(value));
			self.html.push('"');
		}
		self.html.push('>');
		self.open_elements.push(tag);
		self.last_was_text = false;
		self
	}

	/// Closes the innermost open element.
	pub fn close(&mut self) -> &mut Self {
		match self.open_elements.pop() {
			Some(tag) if is_void_element(&tag) => {}
			Some(tag) => {
				self.html.push_str("</");
				self.html.push_str(&tag);
				self.html.push('>');
			}
			None => tracing::warn!("close called without an open element"),
		}
		self.last_was_text = false;
		self
	}

	/// Writes escaped text. Empty text produces no output.
	pub fn text(&mut self, value: &str) -> &mut Self {
		if value.is_empty() {
			// The client creates the node itself; the next text still needs
			// a separator to tell it apart.
			self.last_was_text = true;
			return self;
		}
		if self.last_was_text {
			self.html.push_str("<!---->");
		}
		self.html.push_str(&html_escape::encode_text(value));
		self.last_was_text = true;
		self
	}

	/// Opens a dynamic region.
	pub fn block_start(&mut self) -> &mut Self {
		self.marker(Marker::Start)
	}

	/// Opens a dynamic region whose alternate branch is rendered.
	pub fn block_start_else(&mut self) -> &mut Self {
		self.marker(Marker::StartElse)
	}

	/// Closes the innermost dynamic region.
	pub fn block_end(&mut self) -> &mut Self {
		self.marker(Marker::End)
	}

	fn marker(&mut self, marker: Marker) -> &mut Self {
		self.html.push_str(&marker.to_string());
		self.last_was_text = false;
		self
	}

	/// HTML written so far.
	pub fn as_str(&self) -> &str {
		&self.html
	}

	/// Finishes the output, closing any element left open.
	pub fn finish(mut self) -> String {
		while !self.open_elements.is_empty() {
			self.close();
		}
		self.html
	}
}

/// Runs `component` against a fresh [`ServerOutput`] and returns the HTML.
///
/// ```ignore
/// let html = render_to_string(|out| {
///     out.block_start();
///     out.open("div", &[("class", "a")]).close();
///     out.block_end();
/// });
/// assert_eq!(html, "<!--[--><div class=\"a\"></div><!--]-->");
/// ```
pub fn render_to_string<F>(component: F) -> String
where
	F: FnOnce(&mut ServerOutput),
{
	let mut output = ServerOutput::new();
	component(&mut output);
	output.finish()
}
