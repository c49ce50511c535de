//! Target-view interpretation: which origin children are reused, patched, appended or removed.

use crate::{
	pool::{Acquired, ResourcePool},
	view::{DegradedReuse, PatchPair, TargetViewInstruction, ViewItem, ViewTransform},
	ReconcileError,
};
use tracing::{instrument, trace, warn};

/// What to do when a target's reuse-from token is known but every origin holding it was already handed out.
///
/// The kernel emits this legitimately when one clean element appears more than once in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedReuse {
	/// Append instead, and report it in [`ViewTransform::degraded`].
	///
	/// A clean target gets a deep copy of the first pooled origin item (its own content may be elided by the kernel).
	/// A dirty target is appended as-is.
	Degrade,
	/// Fail with [`ReconcileError::ExhaustedReuse`].
	Reject,
}

impl Default for ExhaustedReuse {
	fn default() -> Self {
		Self::Degrade
	}
}

/// Compares `origin` to `target` and plans the target view.
///
/// Non-group target items are ignored. They must be handled by the caller.
///
/// # Errors
///
/// - [`ReconcileError::MissingIdentity`] iff a group target lacks an identity token.
/// - [`ReconcileError::UnknownReuseToken`] iff a reuse-from token never appeared among the origin groups.
/// - [`ReconcileError::ExhaustedReuse`] iff a pool ran dry under [`ExhaustedReuse::Reject`].
#[instrument(skip(origin, target), fields(origin_len = origin.len(), target_len = target.len()))]
pub fn plan_view<T: ViewItem + Clone>(origin: &[T], target: Vec<T>, exhausted: ExhaustedReuse) -> Result<ViewTransform<T>, ReconcileError> {
	let mut pool = ResourcePool::scan(origin);
	let mut instructions = Vec::with_capacity(target.len());
	let mut patches = Vec::new();
	let mut degraded = Vec::new();

	for (position, item) in target.into_iter().enumerate() {
		if !item.is_group() {
			continue;
		}
		if item.identity().is_none() {
			return Err(ReconcileError::MissingIdentity { position });
		}

		let token = match item.reuse_from().map(str::to_owned) {
			Some(token) => token,
			None => {
				instructions.push(TargetViewInstruction::Append(item));
				continue;
			}
		};
		let clean = item.is_clean_reuse();

		match pool.acquire(&token)? {
			Acquired::Index(i) if clean => {
				trace!(position, origin = i, "Clean reuse.");
				instructions.push(TargetViewInstruction::Reuse(i));
			}
			Acquired::Index(i) => {
				trace!(position, origin = i, "Dirty reuse.");
				patches.push(PatchPair { origin: i, target: item });
				instructions.push(TargetViewInstruction::Reuse(i));
			}
			Acquired::Exhausted { first } => {
				if exhausted == ExhaustedReuse::Reject {
					return Err(ReconcileError::ExhaustedReuse { token });
				}
				warn!(position, token = %token, clean, "Reuse pool exhausted; appending instead.");
				let appended = if clean { origin[first].clone() } else { item };
				instructions.push(TargetViewInstruction::Append(appended));
				degraded.push(DegradedReuse { position, token, clean });
			}
		}
	}

	instructions.extend(pool.into_leftovers().into_iter().map(TargetViewInstruction::Remove));

	Ok(ViewTransform {
		instructions,
		patches,
		degraded,
	})
}
