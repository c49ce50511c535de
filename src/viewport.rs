//! Which part of the document to ask the kernel for.

use crate::{Node, Tag};
use tracing::{trace, warn};

/// Coordinate far beyond any real document, used for unbounded windows.
pub const UNBOUNDED: f64 = 1e33;

/// Inset applied to each side of a slide window, so neighbouring pages don't bleed in.
pub const SLIDE_INSET: f64 = 0.1;

/// Shown in slide mode while the document has no pages.
pub const PLACEHOLDER_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100"><text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle" font-size="20">No page found</text></svg>"#;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

/// An axis-aligned rectangle in document space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
	pub lo: Point,
	pub hi: Point,
}

impl Window {
	/// The whole document.
	pub const FULL: Self = Self {
		lo: Point { x: 0., y: 0. },
		hi: Point { x: UNBOUNDED, y: UNBOUNDED },
	};

	#[must_use]
	pub fn new(lo_x: f64, lo_y: f64, hi_x: f64, hi_y: f64) -> Self {
		Self {
			lo: Point { x: lo_x, y: lo_y },
			hi: Point { x: hi_x, y: hi_y },
		}
	}
}

/// Size of one laid-out page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
	pub width: f64,
	pub height: f64,
}

/// Layout facts sampled from the host once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomState {
	/// Width of the element the document is mounted into, in screen pixels.
	pub container_width: f64,
	pub container_left: f64,
	pub container_top: f64,
	pub screen_left: f64,
	pub screen_top: f64,
	pub inner_width: f64,
	pub inner_height: f64,
	/// User zoom on top of the fit-to-width scale.
	pub scale_ratio: f64,
}

impl Default for DomState {
	fn default() -> Self {
		Self {
			container_width: 0.,
			container_left: 0.,
			container_top: 0.,
			screen_left: 0.,
			screen_top: 0.,
			inner_width: 0.,
			inner_height: 0.,
			scale_ratio: 1.,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
	/// Continuous scrolling through all pages.
	Doc,
	/// One page at a time.
	Slide,
}

impl Default for PreviewMode {
	fn default() -> Self {
		Self::Doc
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderRequest {
	/// Ask the kernel to render this window.
	Window(Window),
	/// Mount this markup as-is without asking the kernel.
	Placeholder(&'static str),
}

/// Width of the mounted document in document units.
///
/// Taken from the root's `data-width` (or `width`) attribute, falling back to the widest page.
#[must_use]
pub fn doc_width(document: Option<&Node>, pages: &[PageInfo]) -> f64 {
	let width = match document {
		Some(root) => root
			.attributes
			.get("data-width")
			.or_else(|| root.attributes.get("width"))
			.and_then(|width| width.trim().parse::<f64>().ok())
			.unwrap_or(1.),
		None => pages.iter().map(|page| page.width).fold(0., f64::max),
	};
	if width < 1e-5 {
		1.
	} else {
		width
	}
}

/// Window for continuous (doc) preview.
///
/// Without partial rendering, that's the whole document.
/// Otherwise it is the visible viewport expanded by one viewport height above and below,
/// then snapped outward to the bounds of the mounted pages it touches.
#[must_use]
pub fn doc_window(document: Option<&Node>, dom: &DomState, doc_width: f64, partial_rendering: bool) -> Window {
	if !partial_rendering {
		return Window::FULL;
	}

	let computed = if dom.container_width > 0. { doc_width / dom.container_width } else { 1. };
	let rev_scale = computed / dom.scale_ratio;
	let left = (dom.screen_left - dom.container_left) * rev_scale;
	let top = (dom.screen_top - dom.container_top) * rev_scale;
	let width = dom.inner_width * rev_scale;
	let height = dom.inner_height * rev_scale;
	trace!(rev_scale, left, top, width, height, "Viewport in document space.");

	let mut top_estimate = top - height - 1.;
	let mut bottom_estimate = top + height * 2. + 1.;
	if let Some(root) = document {
		let mut pages = 0;
		let mut min_top = UNBOUNDED;
		let mut max_bottom = -UNBOUNDED;
		let mut accumulated = 0.;
		for page in root.children.iter().filter(|child| child.tag() == Tag::Page) {
			pages += 1;
			let page_height = page.attributes.get("data-page-height").and_then(|height| height.parse::<f64>().ok()).unwrap_or(0.);
			let translate_y = match page.attributes.get("transform").and_then(translate) {
				Some((_, y)) => y,
				None => {
					warn!(page = pages, "Page without translate transform.");
					accumulated += page_height;
					continue;
				}
			};
			if translate_y + page_height > top_estimate {
				min_top = f64::min(min_top, accumulated);
			}
			if translate_y < bottom_estimate {
				max_bottom = f64::max(max_bottom, accumulated + page_height);
			}
			accumulated += page_height;
		}

		if pages == 0 {
			top_estimate = 0.;
			bottom_estimate = UNBOUNDED;
		} else {
			top_estimate = min_top;
			bottom_estimate = max_bottom;
		}
	}

	Window::new(left - 1., top_estimate, left + width + 1., bottom_estimate)
}

/// Window for slide preview of the 0-based `page`, clamped to the last page.
///
/// Returns the clamped page alongside.
#[must_use]
pub fn slide_window(pages: &[PageInfo], page: usize) -> (RenderRequest, usize) {
	let last = match pages.len().checked_sub(1) {
		Some(last) => last,
		None => return (RenderRequest::Placeholder(PLACEHOLDER_SVG), 0),
	};
	let page = page.min(last);

	let lo_y: f64 = pages[..page].iter().map(|page| page.height).sum();
	let current = pages[page];
	let window = Window::new(SLIDE_INSET, lo_y + SLIDE_INSET, current.width - SLIDE_INSET, lo_y + current.height - SLIDE_INSET);
	trace!(page, ?window, "Slide window.");
	(RenderRequest::Window(window), page)
}

/// Parses `translate(x, y)` out of a transform list.
pub(crate) fn translate(transform: &str) -> Option<(f64, f64)> {
	let start = transform.find("translate(")? + "translate(".len();
	let end = start + transform[start..].find(')')?;
	let mut parts = transform[start..end].split(|c: char| c == ',' || c.is_ascii_whitespace()).filter(|part| !part.is_empty());
	let x = parts.next()?.parse().ok()?;
	let y = parts.next()?.parse().ok()?;
	Some((x, y))
}

#[cfg(test)]
mod tests {
	use super::translate;

	#[test]
	fn parses_translate() {
		assert_eq!(translate("translate(1.5, -20)"), Some((1.5, -20.)));
		assert_eq!(translate("scale(2) translate(0,7)"), Some((0., 7.)));
		assert_eq!(translate("scale(2)"), None);
		assert_eq!(translate("translate(3)"), None);
	}
}
