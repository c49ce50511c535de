//! Origin-view interpretation: turning a target view into edits on the live sequence.
//!
//! The strategy is greedy:
//! removals first (each addressed against the array as it shrinks),
//! then moves that bring reused and anchored items into target order,
//! then insertions of new items at their final offsets, ascending.

use crate::{
	view::{OriginViewInstruction, TargetViewInstruction, ViewItem},
	ReconcileError,
};
use hashbrown::HashSet;
use tracing::{instrument, trace};

/// Converts `instructions`, planned against `origin`, into an origin view.
///
/// Non-group origin items are anchors and keep their relative order.
/// Anchors before the first surviving group stay in front.
/// Every target-ordered item is placed right before the first surviving group,
/// so later anchors end up behind all of them: `[A0, a, A2, b]` planned as `b, a` becomes `[A0, b, a, A2]`.
///
/// # Errors
///
/// Iff `instructions` are inconsistent with `origin`. This points to a bug in planning, not to bad input.
#[instrument(skip(origin, instructions), fields(origin_len = origin.len(), instructions_len = instructions.len()))]
pub fn transpile_view<T: ViewItem>(origin: &[T], instructions: Vec<TargetViewInstruction<T>>) -> Result<Vec<OriginViewInstruction<T>>, ReconcileError> {
	let len = origin.len();
	let mut removals = Vec::new();
	for instruction in &instructions {
		if let TargetViewInstruction::Remove(i) = *instruction {
			if i >= len {
				return Err(ReconcileError::OffsetOutOfRange { offset: i, len });
			}
			removals.push(i);
		}
	}
	removals.sort_unstable();
	if let Some(duplicate) = removals.windows(2).find(|pair| pair[0] == pair[1]) {
		return Err(ReconcileError::DuplicateClaim { offset: duplicate[0] });
	}

	let mut view = Vec::with_capacity(instructions.len());

	// `shift[i]` is where origin position `i` sits once every removal has been applied.
	let mut shift: Vec<Option<usize>> = Vec::with_capacity(len + 1);
	{
		let mut next = removals.iter().copied().peekable();
		let mut removed = 0;
		for i in 0..=len {
			if next.peek() == Some(&i) {
				next.next();
				view.push(OriginViewInstruction::Remove(i - removed));
				removed += 1;
				shift.push(None);
			} else {
				shift.push(Some(i - removed));
			}
		}
	}
	let shifted = |offset: usize| -> Result<usize, ReconcileError> {
		match shift.get(offset) {
			Some(Some(shifted)) => Ok(*shifted),
			Some(None) => Err(ReconcileError::OffsetRemoved { offset }),
			None => Err(ReconcileError::OffsetOutOfRange { offset, len }),
		}
	};

	let mut placement = Placement::default();
	let mut pending = instructions.into_iter();
	let mut drained = false;
	for (offset, item) in origin.iter().enumerate() {
		if shift[offset].is_none() {
			continue;
		}
		if !item.is_group() {
			placement.place(shifted(offset)?)?;
		} else if !drained {
			// Every remaining target instruction lands in front of the first surviving group.
			placement.drain(&mut pending, &shifted)?;
			drained = true;
		}
	}
	placement.drain(&mut pending, &shifted)?;

	let survivors = len - removals.len();
	if placement.order.len() != survivors {
		return Err(ReconcileError::UnplacedOrigin {
			unplaced: survivors.saturating_sub(placement.order.len()),
		});
	}

	// Simulate the moves so every `SwapIn` is addressed against the array as it is at that moment.
	let mut simulated: Vec<usize> = (0..survivors).collect();
	for (to, &wanted) in placement.order.iter().enumerate() {
		let from = simulated[to..]
			.iter()
			.position(|&offset| offset == wanted)
			.map(|i| i + to)
			.ok_or(ReconcileError::DuplicateClaim { offset: wanted })?;
		if from != to {
			let moved = simulated.remove(from);
			simulated.insert(to, moved);
			view.push(OriginViewInstruction::SwapIn { to, from });
		}
	}

	trace!(moves = view.len() - removals.len(), inserts = placement.inserts.len(), "Transpiled.");
	view.extend(placement.inserts);
	Ok(view)
}

struct Placement<T> {
	/// Post-removal offsets of surviving origin items, in target order.
	order: Vec<usize>,
	claimed: HashSet<usize>,
	inserts: Vec<OriginViewInstruction<T>>,
	/// Final offset of the next placed item.
	cursor: usize,
}

impl<T> Default for Placement<T> {
	fn default() -> Self {
		Self {
			order: Vec::new(),
			claimed: HashSet::new(),
			inserts: Vec::new(),
			cursor: 0,
		}
	}
}

impl<T> Placement<T> {
	fn place(&mut self, shifted: usize) -> Result<(), ReconcileError> {
		if !self.claimed.insert(shifted) {
			return Err(ReconcileError::DuplicateClaim { offset: shifted });
		}
		self.order.push(shifted);
		self.cursor += 1;
		Ok(())
	}

	fn drain(&mut self, pending: &mut impl Iterator<Item = TargetViewInstruction<T>>, shifted: &impl Fn(usize) -> Result<usize, ReconcileError>) -> Result<(), ReconcileError> {
		for instruction in pending {
			match instruction {
				TargetViewInstruction::Append(item) => {
					self.inserts.push(OriginViewInstruction::Insert { at: self.cursor, item });
					self.cursor += 1;
				}
				TargetViewInstruction::Reuse(i) => self.place(shifted(i)?)?,
				TargetViewInstruction::Remove(_) => (),
			}
		}
		Ok(())
	}
}

/// Applies `view` to `children`, in order.
///
/// # Errors
///
/// [`ReconcileError::OffsetOutOfRange`] iff an instruction addresses a position the live sequence doesn't have.
/// Instructions before the failing one stay applied.
pub fn replay<T>(children: &mut Vec<T>, view: Vec<OriginViewInstruction<T>>) -> Result<(), ReconcileError> {
	for instruction in view {
		match instruction {
			OriginViewInstruction::Insert { at, item } => {
				if at > children.len() {
					return Err(ReconcileError::OffsetOutOfRange { offset: at, len: children.len() });
				}
				children.insert(at, item);
			}
			OriginViewInstruction::SwapIn { to, from } => {
				if from >= children.len() || to >= children.len() {
					return Err(ReconcileError::OffsetOutOfRange {
						offset: from.max(to),
						len: children.len(),
					});
				}
				let moved = children.remove(from);
				children.insert(to, moved);
			}
			OriginViewInstruction::Remove(i) => {
				if i >= children.len() {
					return Err(ReconcileError::OffsetOutOfRange { offset: i, len: children.len() });
				}
				children.remove(i);
			}
		}
	}
	Ok(())
}
