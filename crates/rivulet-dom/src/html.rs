//! HTML fragment parsing (via `scraper`) and serialization.

use std::collections::HashMap;

use crate::document::{NodeData, NodeId, Tree};
use crate::node::Node;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Elements whose text content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Node {
	/// Replaces the children of this node with the nodes parsed from `html`.
	///
	/// Parsed nodes do not count towards
	/// [`Document::nodes_created`](crate::Document::nodes_created).
	pub fn set_inner_html(&self, html: &str) {
		self.clear_children();

		let fragment = scraper::Html::parse_fragment(html);
		let wrapper = fragment.root_element();
		let doc = self.document();
		let mut tree = doc.tree.borrow_mut();

		let mut mapped = HashMap::new();
		mapped.insert(wrapper.id(), self.id());
		for source in wrapper.descendants().skip(1) {
			let data = match source.value() {
				scraper::Node::Element(element) => NodeData::Element {
					tag: element.name().to_string(),
					attributes: element
						.attrs()
						.map(|(name, value)| (name.to_string(), value.to_string()))
						.collect(),
				},
				scraper::Node::Text(text) => NodeData::Text(String::from(&**text)),
				scraper::Node::Comment(comment) => NodeData::Comment(String::from(&**comment)),
				_ => continue,
			};
			let Some(&parent) = source.parent().and_then(|parent| mapped.get(&parent.id())) else {
				continue;
			};
			let id = tree.push(data);
			let position = tree.entry(parent).children.len();
			tree.insert_at(parent, id, position);
			mapped.insert(source.id(), id);
		}
	}

	/// Serialization of the children of this node.
	pub fn inner_html(&self) -> String {
		let tree = self.document().tree.clone();
		let tree = tree.borrow();
		let mut out = String::new();
		for &child in &tree.entry(self.id()).children {
			serialize(&tree, child, &mut out);
		}
		out
	}

	/// Serialization of this node and its descendants.
	pub fn outer_html(&self) -> String {
		let tree = self.document().tree.clone();
		let tree = tree.borrow();
		let mut out = String::new();
		serialize(&tree, self.id(), &mut out);
		out
	}
}

/// Whether `tag` is a void element (no children, no closing tag).
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS
		.iter()
		.any(|void| void.eq_ignore_ascii_case(tag))
}

fn serialize(tree: &Tree, id: NodeId, out: &mut String) {
	let entry = tree.entry(id);
	match &entry.data {
		NodeData::Element { tag, attributes } => {
			out.push('<');
			out.push_str(tag);
			for (name, value) in attributes {
				out.push(' ');
				out.push_str(name);
				out.push_str("=\"");
				out.push_str(&html_escape::encode_double_quoted_attribute(value));
				out.push('"');
			}
			out.push('>');
			if is_void_element(tag) {
				return;
			}
			let raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
			for &child in &entry.children {
				match &tree.entry(child).data {
					NodeData::Text(data) if raw => out.push_str(data),
					_ => serialize(tree, child, out),
				}
			}
			out.push_str("</");
			out.push_str(tag);
			out.push('>');
		}
		NodeData::Text(data) => out.push_str(&html_escape::encode_text(data)),
		NodeData::Comment(data) => {
			out.push_str("<!--");
			out.push_str(data);
			out.push_str("-->");
		}
		NodeData::Fragment => {
			for &child in &entry.children {
				serialize(tree, child, out);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::{Document, NodeKind};
	use rstest::rstest;

	#[rstest]
	#[case("<p>hello</p>")]
	#[case("<!--[--><div class=\"a\"></div><!--]-->")]
	#[case("<ul><li>1</li><li>2</li></ul>")]
	#[case("a &amp; b &lt;c&gt;")]
	#[case("<br><input type=\"text\">")]
	fn test_parse_then_serialize(#[case] html: &str) {
		let doc = Document::new();
		let root = doc.create_element("div");
		root.set_inner_html(html);
		assert_eq!(root.inner_html(), html);
	}

	#[rstest]
	fn test_parsed_nodes_are_not_counted() {
		let doc = Document::new();
		let root = doc.create_element("div");
		root.set_inner_html("<section><p>a</p><p>b</p></section>");
		assert_eq!(doc.nodes_created(), 1);
		assert_eq!(root.first_child().map(|n| n.kind()), Some(NodeKind::Element));
	}

	#[rstest]
	fn test_markers_parse_as_comments() {
		let doc = Document::new();
		let root = doc.create_element("div");
		root.set_inner_html("<!--[-->x<!--]-->");

		let children = root.children();
		assert_eq!(children.len(), 3);
		assert!(children[0].is_comment());
		assert_eq!(children[0].text().as_deref(), Some("["));
		assert!(children[1].is_text());
		assert_eq!(children[2].text().as_deref(), Some("]"));
	}

	#[rstest]
	fn test_set_inner_html_replaces_children() {
		let doc = Document::new();
		let root = doc.create_element("div");
		root.append_child(&doc.create_text("old"));
		root.set_inner_html("<b>new</b>");
		assert_eq!(root.outer_html(), "<div><b>new</b></div>");
	}

	#[rstest]
	fn test_attribute_escaping() {
		let doc = Document::new();
		let el = doc.create_element("a");
		el.set_attribute("title", "say \"hi\" & go");
		assert_eq!(el.outer_html(), "<a title=\"say &quot;hi&quot; &amp; go\"></a>");
	}
}
