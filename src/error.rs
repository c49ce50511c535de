use thiserror::Error;

/// Broad classification of [`ReconcileError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The kernel broke the identity contract. Not locally recoverable.
	Protocol,
	/// A reuse-from token had no origin left to hand out and degrading was not allowed.
	Exhausted,
	/// Instruction generation addressed a position it must not address. This is a bug in the reconciler.
	Arithmetic,
}

/// Failure while reconciling an origin child list towards a target child list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
	#[error("group at target position {position} carries no identity token")]
	MissingIdentity { position: usize },
	#[error("reuse-from token {token:?} was never present among the origin children")]
	UnknownReuseToken { token: String },
	#[error("reuse-from token {token:?} has no origin child left to reuse")]
	ExhaustedReuse { token: String },
	#[error("origin offset {offset} was addressed after it had been removed")]
	OffsetRemoved { offset: usize },
	#[error("offset {offset} is out of range for {len} children")]
	OffsetOutOfRange { offset: usize, len: usize },
	#[error("origin offset {offset} is claimed by more than one instruction")]
	DuplicateClaim { offset: usize },
	#[error("{unplaced} surviving origin children received no placement")]
	UnplacedOrigin { unplaced: usize },
	#[error("{slots} frozen non-group slots cannot bracket {groups} reconciled groups")]
	SlotMismatch { slots: usize, groups: usize },
	#[error("depth limit reached")]
	DepthLimit,
}

impl ReconcileError {
	#[must_use]
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::MissingIdentity { .. } | Self::UnknownReuseToken { .. } | Self::DepthLimit => ErrorKind::Protocol,
			Self::ExhaustedReuse { .. } => ErrorKind::Exhausted,
			Self::OffsetRemoved { .. } | Self::OffsetOutOfRange { .. } | Self::DuplicateClaim { .. } | Self::UnplacedOrigin { .. } | Self::SlotMismatch { .. } => ErrorKind::Arithmetic,
		}
	}
}

/// Failure while turning markup into a [`Node`](`crate::Node`) tree.
#[derive(Debug, Error)]
pub enum LoadError {
	#[error("malformed markup: {0}")]
	Xml(#[from] quick_xml::Error),
	#[error("malformed attribute: {0}")]
	Attribute(#[from] quick_xml::events::attributes::AttrError),
	#[error("markup is not valid UTF-8: {0}")]
	Utf8(#[from] core::str::Utf8Error),
	#[error("markup contains no root element")]
	NoRoot,
	#[error("markup contains a second root element <{0}>")]
	TrailingRoot(String),
	#[error("element <{0}> is never closed")]
	Unclosed(String),
}

/// Opaque failure reported by the layout kernel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("kernel failure: {0}")]
pub struct KernelError(pub String);

/// Failure while decoding an inbound frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
	#[error("frame has no `,` separating tag and payload")]
	MissingSeparator,
	#[error("frame tag is not valid UTF-8")]
	TagEncoding,
	#[error("payload of {tag:?} frame is not valid UTF-8")]
	PayloadEncoding { tag: &'static str },
	#[error("unknown frame tag {0:?}")]
	UnknownTag(String),
	#[error("malformed location payload {0:?}")]
	Location(String),
}

/// Failure while processing a render event.
#[derive(Debug, Error)]
pub enum PumpError {
	#[error(transparent)]
	Load(#[from] LoadError),
	#[error(transparent)]
	Reconcile(#[from] ReconcileError),
	#[error(transparent)]
	Kernel(#[from] KernelError),
	#[error(transparent)]
	Message(#[from] MessageError),
	#[error("render mailbox is full ({capacity} events)")]
	MailboxFull { capacity: usize },
}
