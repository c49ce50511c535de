use preview_dom::{
	plan::{plan_view, ExhaustedReuse},
	transpile::{replay, transpile_view},
	view::{OriginViewInstruction, TargetViewInstruction},
	ErrorKind, ReconcileError,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

mod tree_;
use tree_::{serials, Item};

fn origin_view(origin: &[Item], target: Vec<Item>) -> Vec<OriginViewInstruction<Item>> {
	let transform = plan_view(origin, target, ExhaustedReuse::Degrade).unwrap();
	transpile_view(origin, transform.instructions).unwrap()
}

#[test]
fn append_and_remove() {
	let origin = [Item::group(0, "0")];
	let t0 = Item::group(1, "t0");
	assert_eq!(
		origin_view(&origin, vec![t0.clone()]),
		vec![OriginViewInstruction::Remove(0), OriginViewInstruction::Insert { at: 0, item: t0 }]
	);
}

#[test]
fn clean_reuse_is_a_no_op() {
	let origin = [Item::group(0, "0")];
	assert!(origin_view(&origin, vec![Item::group(1, "0").reusing("0")]).is_empty());
}

#[test]
fn swap() {
	let origin = [Item::group(0, "0"), Item::group(1, "1")];
	let target = vec![Item::group(2, "1").reusing("1"), Item::group(3, "0").reusing("0")];
	let view = origin_view(&origin, target);
	assert_eq!(view, vec![OriginViewInstruction::SwapIn { to: 0, from: 1 }]);

	let mut live = origin.to_vec();
	replay(&mut live, view).unwrap();
	assert_eq!(serials(&live), [1, 0]);
}

#[test]
fn identical_target_is_a_no_op() {
	let origin = [Item::group(0, "a"), Item::group(1, "a"), Item::group(2, "b")];
	let target: Vec<_> = origin.iter().map(|item| item.clone().reusing(item.identity.as_deref().unwrap())).collect();
	let transform = plan_view(&origin, target, ExhaustedReuse::Degrade).unwrap();
	assert!(transform.patches.is_empty());
	assert!(transpile_view(&origin, transform.instructions).unwrap().is_empty());
}

#[test]
fn unhinted_target_replaces_everything() {
	let origin = [Item::group(0, "a"), Item::group(1, "b"), Item::group(2, "c")];
	let (x, y) = (Item::group(3, "x"), Item::group(4, "y"));
	let transform = plan_view(&origin, vec![x.clone(), y.clone()], ExhaustedReuse::Degrade).unwrap();
	assert!(transform
		.instructions
		.iter()
		.all(|instruction| matches!(instruction, TargetViewInstruction::Append(_) | TargetViewInstruction::Remove(_))));

	assert_eq!(
		transpile_view(&origin, transform.instructions).unwrap(),
		vec![
			OriginViewInstruction::Remove(0),
			OriginViewInstruction::Remove(0),
			OriginViewInstruction::Remove(0),
			OriginViewInstruction::Insert { at: 0, item: x },
			OriginViewInstruction::Insert { at: 1, item: y },
		]
	);
}

#[test]
fn anchors_keep_their_slot() {
	let origin = [Item::anchor(0), Item::group(1, "a"), Item::anchor(2), Item::group(3, "b")];
	let target = vec![Item::group(4, "b").reusing("b"), Item::group(5, "a").reusing("a")];
	let view = origin_view(&origin, target);
	assert_eq!(view, vec![OriginViewInstruction::SwapIn { to: 1, from: 3 }]);

	let mut live = origin.to_vec();
	replay(&mut live, view).unwrap();
	assert_eq!(serials(&live), [0, 3, 1, 2]);
}

#[test]
fn addressing_a_removed_offset_fails() {
	let origin = [Item::group(0, "a")];
	let error = transpile_view(&origin, vec![TargetViewInstruction::Remove(0), TargetViewInstruction::Reuse(0)]).unwrap_err();
	assert_eq!(error, ReconcileError::OffsetRemoved { offset: 0 });
	assert_eq!(error.kind(), ErrorKind::Arithmetic);
}

#[test]
fn inconsistent_instructions_fail() {
	let origin = [Item::group(0, "a"), Item::group(1, "b")];
	assert_eq!(
		transpile_view(&origin, vec![TargetViewInstruction::Remove(5)]).unwrap_err(),
		ReconcileError::OffsetOutOfRange { offset: 5, len: 2 }
	);
	assert_eq!(
		transpile_view(&origin, vec![TargetViewInstruction::Reuse(0), TargetViewInstruction::Reuse(0), TargetViewInstruction::Remove(1)]).unwrap_err(),
		ReconcileError::DuplicateClaim { offset: 0 }
	);
	assert_eq!(
		transpile_view(&origin, vec![TargetViewInstruction::Reuse(0)]).unwrap_err(),
		ReconcileError::UnplacedOrigin { unplaced: 1 }
	);
}

#[test]
fn replay_checks_bounds() {
	let mut live = vec![Item::group(0, "a")];
	assert_eq!(
		replay(&mut live, vec![OriginViewInstruction::Remove(1)]).unwrap_err(),
		ReconcileError::OffsetOutOfRange { offset: 1, len: 1 }
	);
}

const VOCABULARY: &[&str] = &["a", "b", "c", "d", "e", "f"];

/// A random origin, with roughly `anchors` of its items not taking part in reconciliation,
/// and a random target that reuses from it.
fn random_views(rng: &mut StdRng, anchors: f64) -> (Vec<Item>, Vec<Item>) {
	let mut serial = 0;
	let mut next = || {
		serial += 1;
		serial
	};

	let origin: Vec<Item> = (0..rng.gen_range(0..12))
		.map(|_| {
			if rng.gen_bool(anchors) {
				return Item::anchor(next());
			}
			let mut item = Item::group(next(), VOCABULARY[rng.gen_range(0..VOCABULARY.len())]);
			if rng.gen_bool(0.1) {
				item.identity = None;
			}
			item
		})
		.collect();
	let tokens: Vec<&str> = origin.iter().filter(|item| item.group).filter_map(|item| item.identity.as_deref()).collect();

	let target: Vec<Item> = (0..rng.gen_range(0..12))
		.map(|_| {
			let identity = VOCABULARY[rng.gen_range(0..VOCABULARY.len())];
			let item = Item::group(next(), identity);
			if tokens.is_empty() || rng.gen_bool(0.25) {
				item
			} else if rng.gen_bool(0.5) {
				let token = tokens[rng.gen_range(0..tokens.len())];
				Item::group(item.serial, token).reusing(token)
			} else {
				item.reusing(tokens[rng.gen_range(0..tokens.len())])
			}
		})
		.collect();

	(origin, target)
}

/// Serials of the groups the target view places, in order.
fn planned(origin: &[Item], instructions: &[TargetViewInstruction<Item>]) -> Vec<usize> {
	instructions
		.iter()
		.filter_map(|instruction| match instruction {
			TargetViewInstruction::Append(item) => Some(item.serial),
			TargetViewInstruction::Reuse(i) => Some(origin[*i].serial),
			TargetViewInstruction::Remove(_) => None,
		})
		.collect()
}

/// Replaying the origin view must yield exactly what the target view describes.
#[test]
fn randomized_sequences() {
	let mut rng = StdRng::seed_from_u64(0x5eed);

	for _ in 0..500 {
		let (origin, target) = random_views(&mut rng, 0.);
		let transform = plan_view(&origin, target, ExhaustedReuse::Degrade).unwrap();
		let expected = planned(&origin, &transform.instructions);

		let view = transpile_view(&origin, transform.instructions).unwrap();
		let removals = view.iter().take_while(|instruction| matches!(instruction, OriginViewInstruction::Remove(_))).count();
		assert!(view[removals..].iter().all(|instruction| !matches!(instruction, OriginViewInstruction::Remove(_))));

		let mut live = origin.clone();
		replay(&mut live, view).unwrap();
		assert_eq!(serials(&live), expected, "origin: {:?}", origin);
	}
}

/// Items that don't take part in reconciliation survive in their relative order, around the reconciled groups.
#[test]
fn randomized_sequences_with_anchors() {
	let mut rng = StdRng::seed_from_u64(7);

	for _ in 0..1000 {
		let (origin, target) = random_views(&mut rng, 0.3);
		let transform = plan_view(&origin, target, ExhaustedReuse::Degrade).unwrap();
		let expected = planned(&origin, &transform.instructions);
		let anchors: Vec<usize> = origin.iter().filter(|item| !item.group).map(|item| item.serial).collect();

		let view = transpile_view(&origin, transform.instructions).unwrap();
		let mut live = origin.clone();
		replay(&mut live, view).unwrap();

		let groups: Vec<usize> = live.iter().filter(|item| item.group).map(|item| item.serial).collect();
		let kept: Vec<usize> = live.iter().filter(|item| !item.group).map(|item| item.serial).collect();
		assert_eq!(groups, expected, "origin: {:?}", origin);
		assert_eq!(kept, anchors, "origin: {:?}", origin);
		assert_eq!(live.len(), expected.len() + anchors.len());
	}
}
