//! Keyed list rendering.
//!
//! [`each_block`] renders one branch per item. Items are matched across
//! evaluations by key: new keys mount, missing keys are destroyed, and
//! surviving keys keep their block and DOM while their [`Tracked`] item value
//! is updated in place. The DOM follows the order of the latest list.
//!
//! Server output wraps the whole list in a marker pair and each item in its
//! own nested pair, so hydration can hand every item exactly its nodes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::rc::Rc;

use rivulet_dom::Node;
use rivulet_reactive::{Block, BlockKind, Result, Tracked, branch, destroy_block, on_cleanup, render};

use crate::client::{Anchor, Region};
use crate::hydration::is_hydrating;

struct Item<K, T: 'static> {
	key: K,
	value: Tracked<T>,
	block: Block,
	start: Node,
	end: Node,
}

impl<K, T: 'static> Item<K, T> {
	/// The item's nodes, markers included, in document order.
	fn nodes(&self) -> Vec<Node> {
		let mut nodes = vec![self.start.clone()];
		let mut current = self.start.next_sibling();
		while let Some(node) = current {
			if node == self.end {
				break;
			}
			current = node.next_sibling();
			nodes.push(node);
		}
		nodes.push(self.end.clone());
		nodes
	}
}

/// Renders `render_item` for every element of `items()`, keyed by `key`.
///
/// `items` runs inside the list block, so the list re-evaluates whenever a
/// cell it reads changes. `render_item` receives the item's tracked value;
/// reading it makes the item's content follow updates to that key.
///
/// ```ignore
/// each_block(
///     &anchor,
///     move || todos.get(),
///     |todo: &Todo| todo.id,
///     |anchor, todo| {
///         reactive_text(anchor, move || todo.get().title)?;
///         Ok(())
///     },
/// )?;
/// ```
pub fn each_block<T, K, I, KF, R>(anchor: &Anchor, mut items: I, key: KF, render_item: R) -> Result<Block>
where
	T: Clone + PartialEq + 'static,
	K: Eq + Hash + Clone + 'static,
	I: FnMut() -> Vec<T> + 'static,
	KF: Fn(&T) -> K + 'static,
	R: Fn(&Anchor, Tracked<T>) -> Result<()> + 'static,
{
	let region = Region::open(anchor, false)?;
	let list_anchor = region.inner().untracked();
	let render_item = Rc::new(render_item);
	let state: Rc<RefCell<Vec<Item<K, T>>>> = Rc::new(RefCell::new(Vec::new()));

	let block = render(
		move || {
			let next = items();
			let previous = std::mem::take(&mut *state.borrow_mut());
			let reconciled = reconcile(&list_anchor, previous, next, &key, &render_item)?;
			*state.borrow_mut() = reconciled;
			Ok(())
		},
		None,
		BlockKind::Each,
	)?;
	region.close()?;
	Ok(block)
}

fn reconcile<T, K, KF, R>(
	anchor: &Anchor,
	previous: Vec<Item<K, T>>,
	next: Vec<T>,
	key: &KF,
	render_item: &Rc<R>,
) -> Result<Vec<Item<K, T>>>
where
	T: Clone + PartialEq + 'static,
	K: Eq + Hash + Clone + 'static,
	KF: Fn(&T) -> K,
	R: Fn(&Anchor, Tracked<T>) -> Result<()> + 'static,
{
	let mut old: HashMap<K, (usize, Item<K, T>)> = HashMap::new();
	for (index, item) in previous.into_iter().enumerate() {
		match old.entry(item.key.clone()) {
			Entry::Occupied(_) => destroy_block(item.block),
			Entry::Vacant(slot) => {
				slot.insert((index, item));
			}
		}
	}

	let mut items = Vec::with_capacity(next.len());
	let mut in_place = true;
	let mut last_index = None;
	let mut mounted_new = false;
	for value in next {
		let item_key = key(&value);
		match old.remove(&item_key) {
			Some((index, item)) => {
				// Updated before anything else reads it during this flush.
				item.value.set(value);
				if mounted_new || last_index.is_some_and(|last| index < last) {
					in_place = false;
				}
				last_index = Some(index);
				items.push(item);
			}
			None => {
				mounted_new = true;
				items.push(mount_item(anchor, item_key, value, render_item)?);
			}
		}
	}

	for (_, item) in old.into_values() {
		destroy_block(item.block);
	}

	if !in_place && !is_hydrating() {
		for item in &items {
			for node in item.nodes() {
				anchor.insert(&node);
			}
		}
	}
	Ok(items)
}

fn mount_item<T, K, R>(anchor: &Anchor, key: K, value: T, render_item: &Rc<R>) -> Result<Item<K, T>>
where
	T: Clone + PartialEq + 'static,
	R: Fn(&Anchor, Tracked<T>) -> Result<()> + 'static,
{
	let region = Region::open(anchor, true)?;
	let end = region.end.clone();
	let start = region.start.clone().unwrap_or_else(|| end.clone());
	let value = Tracked::new(value);
	let content = region.inner();

	let markers = (start.clone(), end.clone());
	let (item_value, render_item) = (value.clone(), render_item.clone());
	let block = branch(move || {
		let (start, end) = markers.clone();
		on_cleanup(move || {
			start.remove();
			end.remove();
		});
		let (content, item_value, render_item) = (content.clone(), item_value.clone(), render_item.clone());
		render(
			move || render_item(&content, item_value.clone()),
			None,
			BlockKind::Render,
		)?;
		Ok(())
	})?;
	region.close()?;

	Ok(Item {
		key,
		value,
		block,
		start,
		end,
	})
}
