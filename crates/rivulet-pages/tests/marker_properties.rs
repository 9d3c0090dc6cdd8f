//! Property tests over randomly nested server regions.

use proptest::prelude::*;
use rivulet_dom::{Document, Node};
use rivulet_pages::{Anchor, Marker, ServerOutput, find_matching_end, hydrate, if_block, text};
use rivulet_reactive::Result;

#[derive(Debug, Clone)]
enum Shape {
	Text(String),
	Region(Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Vec<Shape>> {
	let leaf = "[a-z]{1,3}".prop_map(Shape::Text);
	let tree = leaf.prop_recursive(4, 24, 4, |inner| {
		prop::collection::vec(inner, 0..4).prop_map(Shape::Region)
	});
	prop::collection::vec(tree, 0..5)
}

fn write_shapes(out: &mut ServerOutput, shapes: &[Shape]) {
	for shape in shapes {
		match shape {
			Shape::Text(value) => {
				out.text(value);
			}
			Shape::Region(children) => {
				out.block_start();
				write_shapes(out, children);
				out.block_end();
			}
		}
	}
}

fn render_shapes(anchor: &Anchor, shapes: &[Shape]) -> Result<()> {
	for shape in shapes {
		match shape {
			Shape::Text(value) => {
				text(anchor, value)?;
			}
			Shape::Region(children) => {
				let children = children.clone();
				if_block(anchor, move |slot| {
					let children = children.clone();
					slot.set((), move |anchor| render_shapes(anchor, &children))
				})?;
			}
		}
	}
	Ok(())
}

fn parse(shapes: &[Shape]) -> (Node, String) {
	let mut out = ServerOutput::new();
	write_shapes(&mut out, shapes);
	let html = out.finish();
	let root = Document::new().create_element("main");
	root.set_inner_html(&html);
	(root, html)
}

/// Pairs each start marker with its end by keeping a stack of open starts.
fn stack_pairs(root: &Node) -> Vec<(Node, Node)> {
	let mut open = Vec::new();
	let mut pairs = Vec::new();
	for node in root.children() {
		match Marker::of(&node) {
			Some(marker) if marker.is_start() => open.push(node),
			Some(Marker::End) => {
				if let Some(start) = open.pop() {
					pairs.push((start, node));
				}
			}
			_ => {}
		}
	}
	pairs
}

proptest! {
	#[test]
	fn matching_end_agrees_with_stack(shapes in shape_strategy()) {
		let (root, _) = parse(&shapes);
		for (start, end) in stack_pairs(&root) {
			prop_assert_eq!(find_matching_end(&start), Some(end));
		}
	}

	#[test]
	fn nested_regions_hydrate_in_place(shapes in shape_strategy()) {
		let (root, html) = parse(&shapes);
		let created = root.document().nodes_created();

		let tree = hydrate(&root, move |anchor| render_shapes(anchor, &shapes));
		prop_assert!(tree.is_ok());
		prop_assert_eq!(root.document().nodes_created(), created);
		prop_assert_eq!(root.inner_html(), html);

		if let Ok(tree) = tree {
			tree.unmount();
		}
		prop_assert_eq!(root.inner_html(), "");
	}
}
