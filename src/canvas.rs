//! Page-by-page raster rendering with cooperative cancellation.
//!
//! A raster pass can take a while for long documents.
//! A superseding update cancels it through the [`CancelHandle`]:
//! the pass notices between pages, stops, and reports how far it got through the handle's completion channel.

use crate::{viewport::PageInfo, KernelError};
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};
use tokio::sync::oneshot;
use tracing::{debug, instrument, trace};

/// Creates a linked cancellation pair for one raster pass.
#[must_use]
pub fn cancellation() -> (CancelHandle, CancelToken) {
	let flag = Arc::new(AtomicBool::new(false));
	let (done, completion) = oneshot::channel();
	(
		CancelHandle {
			flag: Arc::clone(&flag),
			completion,
		},
		CancelToken { flag, done },
	)
}

/// The canceller's side.
#[derive(Debug)]
pub struct CancelHandle {
	flag: Arc<AtomicBool>,
	completion: oneshot::Receiver<RasterOutcome>,
}

impl CancelHandle {
	/// Requests cancellation and returns the channel the pass completes through.
	///
	/// The receiver errors iff the pass was abandoned without finishing (for example because the kernel failed).
	#[must_use = "await the receiver to know when the raster pass has stopped"]
	pub fn cancel(self) -> oneshot::Receiver<RasterOutcome> {
		self.flag.store(true, Ordering::Release);
		self.completion
	}

	/// Waits for the pass without cancelling it.
	#[must_use]
	pub fn into_completion(self) -> oneshot::Receiver<RasterOutcome> {
		self.completion
	}
}

/// The raster pass's side.
#[derive(Debug)]
pub struct CancelToken {
	flag: Arc<AtomicBool>,
	done: oneshot::Sender<RasterOutcome>,
}

impl CancelToken {
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.flag.load(Ordering::Acquire)
	}

	/// Signals completion. A dropped handle is fine.
	pub fn finish(self, outcome: RasterOutcome) {
		if self.done.send(outcome).is_err() {
			trace!("Nobody is waiting for the raster pass.");
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterOutcome {
	Completed { rendered: usize },
	Cancelled { rendered: usize },
}

/// What a [`Rasterizer`] is asked to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRaster<'a> {
	pub index: usize,
	pub pixel_per_pt: f64,
	/// Key of what the target canvas currently shows, if its size is unchanged.
	/// The rasterizer may skip drawing if its content for the page still has this key.
	pub cache_key: Option<&'a str>,
}

/// Draws single pages. Implemented by the kernel binding.
pub trait Rasterizer {
	/// Renders one page and returns the cache key of what was drawn.
	///
	/// # Errors
	///
	/// Iff the kernel fails.
	fn render_page(&mut self, page: PageRaster<'_>) -> Result<String, KernelError>;
}

/// One page canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasPage {
	pub index: usize,
	pub info: PageInfo,
	/// Width the canvas was last drawn at, formatted to three decimals.
	width: String,
	height: String,
	cache_key: Option<String>,
}

impl CanvasPage {
	fn new(index: usize, info: PageInfo) -> Self {
		Self {
			index,
			info,
			width: String::new(),
			height: String::new(),
			cache_key: None,
		}
	}

	#[must_use]
	pub fn cache_key(&self) -> Option<&str> {
		self.cache_key.as_deref()
	}

	/// Canvas size in device pixels.
	#[must_use]
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	pub fn pixel_size(&self, pixel_per_pt: f64) -> (u32, u32) {
		(
			(self.info.width * pixel_per_pt).max(0.) as u32,
			(self.info.height * pixel_per_pt).max(0.) as u32,
		)
	}
}

/// The set of page canvases mirroring the kernel's pages.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasRaster {
	pages: Vec<CanvasPage>,
	pixel_per_pt: f64,
}

impl Default for CanvasRaster {
	fn default() -> Self {
		Self::new(3.)
	}
}

impl CanvasRaster {
	#[must_use]
	pub fn new(pixel_per_pt: f64) -> Self {
		Self {
			pages: Vec::new(),
			pixel_per_pt,
		}
	}

	#[must_use]
	pub fn pages(&self) -> &[CanvasPage] {
		&self.pages
	}

	#[must_use]
	pub fn pixel_per_pt(&self) -> f64 {
		self.pixel_per_pt
	}

	/// Keeps exactly one canvas per kernel page. Surplus canvases are dropped, existing ones keep their cache key.
	pub fn sync_pages(&mut self, pages: &[PageInfo]) {
		if self.pages.len() > pages.len() {
			debug!(dropped = self.pages.len() - pages.len(), "Dropping surplus page canvases.");
			self.pages.truncate(pages.len());
		}
		for (page, &info) in self.pages.iter_mut().zip(pages) {
			page.info = info;
		}
		let known = self.pages.len();
		self.pages.extend(pages[known..].iter().enumerate().map(|(i, &info)| CanvasPage::new(known + i, info)));
	}

	/// Renders every page in order, checking `token` before each one.
	///
	/// A page's cache key is only offered back to the rasterizer while its size is unchanged.
	///
	/// # Errors
	///
	/// Iff the rasterizer fails. `token` is then dropped without finishing.
	#[instrument(skip(self, rasterizer, token), fields(pages = self.pages.len()))]
	pub fn rasterize(&mut self, rasterizer: &mut impl Rasterizer, token: CancelToken) -> Result<RasterOutcome, KernelError> {
		let mut rendered = 0;
		for page in &mut self.pages {
			if token.is_cancelled() {
				debug!(rendered, "Raster pass cancelled.");
				let outcome = RasterOutcome::Cancelled { rendered };
				token.finish(outcome);
				return Ok(outcome);
			}

			let width = format!("{:.3}", page.info.width);
			let height = format!("{:.3}", page.info.height);
			let mut cached = true;
			if page.width != width {
				page.width = width;
				cached = false;
			}
			if page.height != height {
				page.height = height;
				cached = false;
			}

			let key = rasterizer.render_page(PageRaster {
				index: page.index,
				pixel_per_pt: self.pixel_per_pt,
				cache_key: if cached { page.cache_key.as_deref() } else { None },
			})?;
			if page.cache_key.as_deref() != Some(key.as_str()) {
				trace!(page = page.index, key = %key, "Cache key changed.");
				page.cache_key = Some(key);
			}
			rendered += 1;
		}

		let outcome = RasterOutcome::Completed { rendered };
		token.finish(outcome);
		Ok(outcome)
	}
}
