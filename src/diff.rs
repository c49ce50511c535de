use crate::{
	header::{self, HeaderGrowth, HEADER_LEN},
	plan::{plan_view, ExhaustedReuse},
	transpile::{replay, transpile_view},
	view::{DegradedReuse, OriginViewInstruction, TargetViewInstruction},
	Node, ReconcileError,
};
use core::mem;
use tracing::{error, info, instrument, trace, trace_span, warn};

/// Default for [`ElementPatcher::with_depth_limit`].
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

/// Patches a mounted SVG tree (the *origin*) in place so that it matches a freshly rendered, detached *target* tree.
///
/// Elements are matched by content-derived identity rather than by position:
/// a target `<g>` declares via its reuse-from hint which origin `<g>` it continues from.
/// Reused origin elements are moved, not recreated, so anything attached to them survives.
///
/// Everything that is not a `<g>` is replaced wholesale, by relative position between the reconciled groups.
///
/// The first [`HEADER_LEN`] root children are global resources (glyph definitions, clip-path definitions, stylesheet)
/// which are only ever grown.
#[derive(Debug, Clone)]
pub struct ElementPatcher {
	exhausted_reuse: ExhaustedReuse,
	depth_limit: usize,
	header_len: usize,
}

impl Default for ElementPatcher {
	fn default() -> Self {
		Self::new()
	}
}

/// What a patch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
	/// Reused groups whose identity was unchanged, so their subtree was skipped.
	pub clean: usize,
	/// Reused groups that were patched recursively.
	pub patched: usize,
	pub appended: usize,
	pub removed: usize,
	pub moved: usize,
	/// Non-group children replaced by position.
	pub replaced: usize,
	pub degraded: Vec<DegradedReuse>,
	pub header: HeaderGrowth,
}

impl ElementPatcher {
	#[must_use]
	pub fn new() -> Self {
		Self {
			exhausted_reuse: ExhaustedReuse::default(),
			depth_limit: DEFAULT_DEPTH_LIMIT,
			header_len: HEADER_LEN,
		}
	}

	#[must_use]
	pub fn with_exhausted_reuse(mut self, exhausted_reuse: ExhaustedReuse) -> Self {
		self.exhausted_reuse = exhausted_reuse;
		self
	}

	#[must_use]
	pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	#[must_use]
	pub fn with_header_len(mut self, header_len: usize) -> Self {
		self.header_len = header_len;
		self
	}

	/// Patches the mounted document root `origin` towards `target`.
	///
	/// # Errors
	///
	/// Iff the target breaks the identity contract or the depth limit is reached.
	/// `origin` may then be partially patched, but remains a well-formed tree.
	#[instrument(skip(self, origin, target), fields(mounted.children = origin.children.len(), rendered.children = target.children.len()))]
	pub fn patch_root(&self, origin: &mut Node, mut target: Node) -> Result<PatchReport, ReconcileError> {
		let mut report = PatchReport::default();
		sync_attributes(origin, &target);

		let mut header = mem::take(&mut target.children);
		let since = self.header_len.min(header.len());
		let body = header.split_off(since);
		if origin.children.len() >= since && header::same_kinds(&origin.children[..since], &header) {
			report.header = header::patch_header(&mut origin.children[..since], header);
		} else {
			// Nothing to grow from. Leading non-groups are replaced by the rendered header.
			let stale = origin.children.iter().take_while(|child| !child.is_group()).count();
			warn!(stale, "Mounted header doesn't match the rendered one; replacing it.");
			for resource in &mut header {
				resource.forget_reuse_hints();
			}
			let rest = origin.children.split_off(stale);
			origin.children = header;
			origin.children.extend(rest);
			report.replaced += since;
		}

		self.patch_children(origin, body, since, self.depth_limit, &mut report)?;
		info!(
			clean = report.clean,
			patched = report.patched,
			appended = report.appended,
			removed = report.removed,
			moved = report.moved,
			"Patched document root."
		);
		Ok(report)
	}

	/// Syncs `origin`'s attributes with `target`, then, unless `target` continues from `origin` unchanged, patches its children.
	///
	/// # Errors
	///
	/// See [`ElementPatcher::patch_root`].
	pub fn reuse_or_patch(&self, origin: &mut Node, target: Node) -> Result<PatchReport, ReconcileError> {
		let mut report = PatchReport::default();
		self.reuse_or_patch_at(origin, target, self.depth_limit, &mut report)?;
		Ok(report)
	}

	fn reuse_or_patch_at(&self, origin: &mut Node, mut target: Node, depth_limit: usize, report: &mut PatchReport) -> Result<(), ReconcileError> {
		let span = trace_span!("Reuse or patch", mounted = ?origin.identity, rendered = ?target.identity);
		let _enter = span.enter();
		if cfg!(feature = "dangerous-logging") {
			trace!(rendered = %target, "Rendered subtree.");
		}

		let clean = origin.identity.is_some() && origin.identity == target.identity;
		target.reuse_from = None;
		sync_attributes(origin, &target);
		if clean {
			report.clean += 1;
			return Ok(());
		}

		report.patched += 1;
		if origin.name != target.name {
			warn!("Patching <{}> into <{}>.", origin.name, target.name);
			origin.name = mem::take(&mut target.name);
		}
		if origin.text != target.text {
			origin.text = mem::take(&mut target.text);
		}
		let children = mem::take(&mut target.children);
		self.patch_children(origin, children, 0, depth_limit, report)
	}

	/// Reconciles `origin.children[since..]` with `target`.
	/// `origin.children[..since]` stay where they are.
	fn patch_children(&self, origin: &mut Node, target: Vec<Node>, since: usize, depth_limit: usize, report: &mut PatchReport) -> Result<(), ReconcileError> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return Err(ReconcileError::DepthLimit);
		}

		// Freeze non-group children: they carry no identity and are replaced by relative position.
		let tail = origin.children.split_off(since);
		let before = tail.len();
		origin.children.extend(tail.into_iter().filter(Node::is_group));
		let dropped = before - (origin.children.len() - since);

		let mut slots = Vec::new();
		let mut slot = Vec::new();
		let mut groups = Vec::with_capacity(target.len());
		for child in target {
			if child.is_group() {
				groups.push(child);
				slots.push(mem::take(&mut slot));
			} else {
				slot.push(child);
			}
		}
		slots.push(slot);
		let incoming = slots.iter().map(Vec::len).sum::<usize>();
		trace!(dropped, incoming, "Froze non-group children.");
		report.replaced += incoming;

		let transform = plan_view(&origin.children, groups, self.exhausted_reuse)?;
		report.degraded.extend(transform.degraded);
		let dirty = transform.patches.len();

		for pair in transform.patches {
			let len = origin.children.len();
			let reused = origin.children.get_mut(pair.origin).ok_or(ReconcileError::OffsetOutOfRange { offset: pair.origin, len })?;
			self.reuse_or_patch_at(reused, pair.target, depth_limit - 1, report)?;
		}

		let mut instructions = transform.instructions;
		for instruction in &mut instructions {
			match instruction {
				TargetViewInstruction::Append(appended) => {
					appended.forget_reuse_hints();
					report.appended += 1;
				}
				TargetViewInstruction::Reuse(_) => (),
				TargetViewInstruction::Remove(_) => report.removed += 1,
			}
		}
		let reused = instructions.iter().filter(|instruction| matches!(instruction, TargetViewInstruction::Reuse(_))).count();

		let view = transpile_view(&origin.children, instructions)?;
		report.moved += view.iter().filter(|instruction| matches!(instruction, OriginViewInstruction::SwapIn { .. })).count();
		replay(&mut origin.children, view)?;
		report.clean += reused - dirty;

		// Thaw.
		let reconciled = origin.children.split_off(since);
		if reconciled.len() + 1 != slots.len() {
			return Err(ReconcileError::SlotMismatch {
				slots: slots.len(),
				groups: reconciled.len(),
			});
		}
		let mut slots = slots.into_iter();
		for group in reconciled {
			origin.children.extend(slots.next().into_iter().flatten());
			origin.children.push(group);
		}
		origin.children.extend(slots.flatten());
		Ok(())
	}
}

/// Whole-set attribute replacement, skipped if nothing differs. Also carries the identity token over.
///
/// Returns whether anything changed.
pub fn sync_attributes(origin: &mut Node, target: &Node) -> bool {
	if origin.attributes.same_as(&target.attributes) && origin.identity == target.identity {
		return false;
	}
	origin.attributes.clear();
	for (name, value) in target.attributes.iter() {
		origin.attributes.set(name, value);
	}
	origin.identity.clone_from(&target.identity);
	true
}
