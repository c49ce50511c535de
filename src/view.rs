//! Views over a child sequence and the instructions that transform them.
//!
//! A *target view* describes how to build the desired (target) sequence from nothing,
//! given the origin children as a pool of reusable resources:
//!
//! ```text
//! resources: []       <append t1>                      -> [t1]
//! resources: [o1]     <reuse o1>                       -> [o1]
//! resources: [o1, o2] <reuse o1> <append t1> <remove o2> -> [o1, t1], o2 removed
//! ```
//!
//! An *origin view* expresses the same change as edits that can be replayed, in order,
//! directly against the live origin sequence:
//!
//! ```text
//! [o0, o1]         <insert 1, t1> -> [o0, t1, o1]
//! [o0, o1, o2, o3] <swap_in 0, 2> -> [o2, o0, o1, o3]
//! [o0, o1, o2]     <remove 1>     -> [o0, o2]
//! ```

use crate::Node;

/// Something that can sit in a reconciled child sequence.
pub trait ViewItem {
	/// Whether this item takes part in identity-based reconciliation.
	/// Other items are anchored by position.
	fn is_group(&self) -> bool;
	fn identity(&self) -> Option<&str>;
	fn reuse_from(&self) -> Option<&str>;

	/// Whether this item declares that it continues, unchanged, from an origin item with its own identity.
	fn is_clean_reuse(&self) -> bool {
		match (self.identity(), self.reuse_from()) {
			(Some(identity), Some(reuse_from)) => identity == reuse_from,
			_ => false,
		}
	}
}

impl ViewItem for Node {
	fn is_group(&self) -> bool {
		Node::is_group(self)
	}

	fn identity(&self) -> Option<&str> {
		self.identity.as_deref()
	}

	fn reuse_from(&self) -> Option<&str> {
		self.reuse_from.as_deref()
	}
}

/// Instruction relative to the target sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetViewInstruction<T> {
	/// Place a new item next.
	Append(T),
	/// Place the origin item at this origin index next.
	Reuse(usize),
	/// Discard the origin item at this origin index.
	Remove(usize),
}

/// Instruction relative to the live origin sequence. Replay strictly in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginViewInstruction<T> {
	/// Insert a new item so that it lands at `at`.
	Insert { at: usize, item: T },
	/// Move the item currently at `from` so that it lands at `to`.
	SwapIn { to: usize, from: usize },
	/// Remove the item currently at this index.
	Remove(usize),
}

/// An origin item that is reused but not identical to its target, so it must be patched recursively.
///
/// The patch is applied to the origin item *in place*, before any instruction moves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPair<T> {
	pub origin: usize,
	pub target: T,
}

/// A reuse-from hint that could not be honoured because its pool was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedReuse {
	/// Position among the target children.
	pub position: usize,
	pub token: String,
	/// Whether the target declared a clean reuse, in which case a copy of the pooled origin item was appended instead.
	pub clean: bool,
}

/// Output of the [planner](`crate::plan::plan_view`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTransform<T> {
	pub instructions: Vec<TargetViewInstruction<T>>,
	pub patches: Vec<PatchPair<T>>,
	pub degraded: Vec<DegradedReuse>,
}
