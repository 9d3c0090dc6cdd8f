//! Block markers for SSR.
//!
//! The server renderer wraps every dynamic region (conditional or list) in a
//! pair of comment markers. During hydration the walker uses them to find
//! where a region ends without re-rendering it:
//!
//! | Marker | Comment data | Serialized |
//! |---|---|---|
//! | [`Marker::Start`] | `[` | `<!--[-->` |
//! | [`Marker::StartElse`] | `[!` | `<!--[!-->` |
//! | [`Marker::End`] | `]` | `<!--]-->` |
//!
//! The textual form is a wire format shared by server and client; changing
//! it breaks hydration of previously rendered pages.

use std::fmt;

use rivulet_dom::Node;

/// Comment data of a block start marker.
pub const BLOCK_START: &str = "[";

/// Comment data of an alternate-branch start marker.
pub const BLOCK_START_ELSE: &str = "[!";

/// Comment data of a block end marker.
pub const BLOCK_END: &str = "]";

/// One of the three marker kinds embedded in server output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
	/// Opens a region.
	Start,
	/// Opens a region whose alternate branch was rendered.
	StartElse,
	/// Closes the innermost open region.
	End,
}

impl Marker {
	/// Comment data of this marker.
	pub const fn data(self) -> &'static str {
		match self {
			Self::Start => BLOCK_START,
			Self::StartElse => BLOCK_START_ELSE,
			Self::End => BLOCK_END,
		}
	}

	/// Parses comment data; anything else is not a marker.
	pub fn parse(data: &str) -> Option<Self> {
		match data {
			BLOCK_START => Some(Self::Start),
			BLOCK_START_ELSE => Some(Self::StartElse),
			BLOCK_END => Some(Self::End),
			_ => None,
		}
	}

	/// The marker a DOM node represents, if it is a marker comment.
	pub fn of(node: &Node) -> Option<Self> {
		if !node.is_comment() {
			return None;
		}
		node.text().as_deref().and_then(Self::parse)
	}

	/// Whether this marker opens a region.
	pub fn is_start(self) -> bool {
		matches!(self, Self::Start | Self::StartElse)
	}
}

impl fmt::Display for Marker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<!--{}-->", self.data())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rivulet_dom::Document;
	use rstest::rstest;

	#[rstest]
	#[case(Marker::Start, "<!--[-->")]
	#[case(Marker::StartElse, "<!--[!-->")]
	#[case(Marker::End, "<!--]-->")]
	fn test_marker_wire_form(#[case] marker: Marker, #[case] expected: &str) {
		assert_eq!(marker.to_string(), expected);
		assert_eq!(Marker::parse(marker.data()), Some(marker));
	}

	#[rstest]
	#[case("")]
	#[case("[[")]
	#[case(" [")]
	#[case("]!")]
	fn test_non_marker_data(#[case] data: &str) {
		assert_eq!(Marker::parse(data), None);
	}

	#[rstest]
	fn test_marker_of_node() {
		let doc = Document::new();
		assert_eq!(Marker::of(&doc.create_comment("[!")), Some(Marker::StartElse));
		// Text with marker-like data is not a marker.
		assert_eq!(Marker::of(&doc.create_text("[")), None);
		assert_eq!(Marker::of(&doc.create_element("div")), None);
	}

	#[rstest]
	fn test_is_start() {
		assert!(Marker::Start.is_start());
		assert!(Marker::StartElse.is_start());
		assert!(!Marker::End.is_start());
	}
}
