//! Inbound frames from the preview server.
//!
//! Every frame is `tag,payload`, split at the first comma.

use crate::MessageError;
use core::str;
use tracing::trace;

/// Sent by the server instead of a document while it has nothing rendered yet.
pub const NOT_AVAILABLE: &[u8] = b"current not avalible";

/// Work for the render pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
	/// Full snapshot delta. Resets the session.
	New(Vec<u8>),
	/// Incremental delta to merge into the kernel.
	DiffV1(Vec<u8>),
	/// Legacy markup fragment to patch directly into the mounted document.
	DiffV0(String),
	/// Re-render the current window.
	ViewportChange,
}

impl RenderEvent {
	#[must_use]
	pub fn tag(&self) -> &'static str {
		match self {
			Self::New(_) => "new",
			Self::DiffV1(_) => "diff-v1",
			Self::DiffV0(_) => "diff-v0",
			Self::ViewportChange => "viewport-change",
		}
	}
}

/// Position in the document, with a 1-based page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
	pub page: usize,
	pub x: f64,
	pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
	Render(RenderEvent),
	/// The editor cursor moved.
	Cursor(Location),
	/// The editor asks to scroll to a location.
	Jump(Location),
	/// Switch partial rendering on.
	PartialRendering,
	/// Nothing rendered yet. Ignore.
	NotAvailable,
}

impl Inbound {
	/// # Errors
	///
	/// Iff `frame` is malformed or carries an unknown tag.
	pub fn decode(frame: &[u8]) -> Result<Self, MessageError> {
		if frame == NOT_AVAILABLE {
			return Ok(Self::NotAvailable);
		}
		let comma = frame.iter().position(|&b| b == b',').ok_or(MessageError::MissingSeparator)?;
		let tag = str::from_utf8(&frame[..comma]).map_err(|_| MessageError::TagEncoding)?;
		let payload = &frame[comma + 1..];
		trace!(tag, payload.len = payload.len(), "Decoding frame.");

		Ok(match tag {
			"new" => Self::Render(RenderEvent::New(payload.to_vec())),
			"diff-v1" => Self::Render(RenderEvent::DiffV1(payload.to_vec())),
			"diff-v0" => Self::Render(RenderEvent::DiffV0(
				str::from_utf8(payload).map_err(|_| MessageError::PayloadEncoding { tag: "diff-v0" })?.to_owned(),
			)),
			"viewport-change" => Self::Render(RenderEvent::ViewportChange),
			"cursor" => Self::Cursor(location(payload, "cursor")?),
			"jump" => Self::Jump(location(payload, "jump")?),
			"partial-rendering" => Self::PartialRendering,
			unknown => return Err(MessageError::UnknownTag(unknown.to_owned())),
		})
	}
}

/// Parses `"page x y"`.
fn location(payload: &[u8], tag: &'static str) -> Result<Location, MessageError> {
	let text = str::from_utf8(payload).map_err(|_| MessageError::PayloadEncoding { tag })?;
	let malformed = || MessageError::Location(text.to_owned());
	let mut parts = text.split_ascii_whitespace();
	let page = parts.next().and_then(|page| page.parse().ok()).ok_or_else(malformed)?;
	let x = parts.next().and_then(|x| x.parse().ok()).ok_or_else(malformed)?;
	let y = parts.next().and_then(|y| y.parse().ok()).ok_or_else(malformed)?;
	if parts.next().is_some() {
		return Err(malformed());
	}
	Ok(Location { page, x, y })
}
