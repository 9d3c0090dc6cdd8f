//! Property tests for the reactive graph: dependency minimality, stale
//! dependents, idempotent destroy and flush determinism.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use rivulet_reactive::{Block, BlockKind, Tracked, destroy_block, flush, render, with_runtime};
use rstest::rstest;
use serial_test::serial;

const CELLS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
	Write { cell: usize, value: i32 },
	Flush,
}

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		3 => (0..CELLS, 0..4i32).prop_map(|(cell, value)| Op::Write { cell, value }),
		1 => Just(Op::Flush),
	]
}

/// Mounts one block per read mask; each run appends its index to `log`.
fn mount_readers(
	cells: &[Tracked<i32>],
	masks: &[u8],
	log: &Rc<RefCell<Vec<usize>>>,
) -> Vec<Block> {
	masks
		.iter()
		.enumerate()
		.map(|(index, &mask)| {
			let cells = cells.to_vec();
			let log = log.clone();
			render(
				move || {
					for (bit, cell) in cells.iter().enumerate() {
						if mask & (1 << bit) != 0 {
							cell.get();
						}
					}
					log.borrow_mut().push(index);
					Ok(())
				},
				None,
				BlockKind::Render,
			)
			.unwrap()
		})
		.collect()
}

fn replay(masks: &[u8], ops: &[Op]) -> Vec<usize> {
	let cells: Vec<_> = (0..CELLS).map(|_| Tracked::new(0)).collect();
	let log = Rc::new(RefCell::new(Vec::new()));
	let blocks = mount_readers(&cells, masks, &log);
	log.borrow_mut().clear();

	for op in ops {
		match op {
			Op::Write { cell, value } => cells[*cell].set(*value),
			Op::Flush => flush().unwrap(),
		}
	}
	flush().unwrap();

	for block in blocks {
		destroy_block(block);
	}
	log.take()
}

proptest! {
	#[test]
	fn flush_order_is_deterministic(
		masks in prop::collection::vec(0u8..8, 1..5),
		ops in prop::collection::vec(op_strategy(), 0..20),
	) {
		let first = replay(&masks, &ops);
		let second = replay(&masks, &ops);
		prop_assert_eq!(first, second);
	}

	#[test]
	fn only_readers_rerun(
		masks in prop::collection::vec(0u8..8, 1..5),
		cell in 0..CELLS,
	) {
		let cells: Vec<_> = (0..CELLS).map(|_| Tracked::new(0)).collect();
		let log = Rc::new(RefCell::new(Vec::new()));
		let blocks = mount_readers(&cells, &masks, &log);
		log.borrow_mut().clear();

		cells[cell].set(1);
		flush().unwrap();

		let expected: Vec<usize> = masks
			.iter()
			.enumerate()
			.filter(|&(_, mask)| mask & (1 << cell) != 0)
			.map(|(index, _)| index)
			.collect();
		prop_assert_eq!(log.borrow().clone(), expected);

		for block in blocks {
			destroy_block(block);
		}
	}
}

#[rstest]
#[serial]
fn test_destroyed_block_leaves_no_subscriptions() {
	let cell = Tracked::new(0);
	let log = Rc::new(RefCell::new(Vec::new()));
	let blocks = mount_readers(std::slice::from_ref(&cell), &[1, 1], &log);
	assert_eq!(with_runtime(|rt| rt.subscriber_count(cell.id())), 2);

	destroy_block(blocks[0]);
	destroy_block(blocks[0]);
	assert_eq!(with_runtime(|rt| rt.subscriber_count(cell.id())), 1);
	assert_eq!(with_runtime(|rt| rt.stats().blocks_destroyed), 1);

	log.borrow_mut().clear();
	cell.set(5);
	flush().unwrap();
	assert_eq!(*log.borrow(), vec![1]);
}

#[rstest]
#[serial]
fn test_destroy_while_pending_removes_from_queue() {
	let cell = Tracked::new(0);
	let log = Rc::new(RefCell::new(Vec::new()));
	let blocks = mount_readers(std::slice::from_ref(&cell), &[1], &log);
	log.borrow_mut().clear();

	cell.set(1);
	assert_eq!(with_runtime(|rt| rt.pending_count()), 1);
	destroy_block(blocks[0]);
	assert_eq!(with_runtime(|rt| rt.pending_count()), 0);

	flush().unwrap();
	assert!(log.borrow().is_empty());
}

#[rstest]
#[serial]
fn test_nested_blocks_destroyed_with_parent() {
	let inner_alive = Rc::new(RefCell::new(None));
	let outer = render(
		{
			let inner_alive = inner_alive.clone();
			move || {
				let inner = render(|| Ok(()), None, BlockKind::Render)?;
				*inner_alive.borrow_mut() = Some(inner);
				Ok(())
			}
		},
		None,
		BlockKind::Root,
	)
	.unwrap();

	let inner = inner_alive.borrow().unwrap();
	assert!(inner.is_alive());
	outer.destroy();
	assert!(!inner.is_alive());
	assert!(!with_runtime(|rt| rt.has_block(inner)));
}
