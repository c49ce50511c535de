//! The render pump: feeds queued render events through the kernel and the [`ElementPatcher`], one frame at a time.
//!
//! The pump is single-threaded and owns the kernel exclusively.
//! The host drives it by calling [`RenderPump::run_frame`] once per display frame
//! and [`RenderPump::tick`] whenever a [deferred viewport change](`RenderPump::deferred_until`) becomes due.

use crate::{
	canvas::{self, CanvasRaster, PageRaster, Rasterizer},
	load_markup,
	message::{Inbound, Location, RenderEvent},
	viewport::{self, DomState, PageInfo, PreviewMode, RenderRequest, Window},
	ElementPatcher, ExhaustedReuse, KernelError, Node, PumpError,
};
use std::{
	collections::VecDeque,
	time::{Duration, Instant},
};
use tracing::{debug, error, info, instrument, trace, warn};

/// The layout kernel. Opaque.
pub trait Kernel {
	/// Forgets all document state.
	fn reset(&mut self);

	/// # Errors
	///
	/// Iff `delta` can't be merged.
	fn merge_delta(&mut self, delta: &[u8]) -> Result<(), KernelError>;

	/// Renders the part of the document inside `window` as SVG markup.
	///
	/// # Errors
	///
	/// Iff rendering fails.
	fn render_in_window(&mut self, window: Window) -> Result<String, KernelError>;

	fn pages_info(&self) -> Vec<PageInfo>;

	/// Draws one page for [`RenderMode::Canvas`]. Returns the new cache key.
	///
	/// # Errors
	///
	/// Iff rendering fails. By default, canvas rendering is unsupported.
	fn render_canvas_page(&mut self, page: PageRaster<'_>) -> Result<String, KernelError> {
		Err(KernelError(format!("canvas rendering of page {} is not supported", page.index)))
	}
}

/// Host-side collaborator: DOM measurements and post-patch layout.
pub trait Frontend {
	/// Sampled at the start of each frame.
	fn dom_state(&self) -> DomState;

	/// Runs after the pump settles or fails. `document` is the mounted tree, if any.
	fn post_process(&mut self, document: Option<&Node>);

	/// Scrolls the view to `location` (1-based page). Ignored by default.
	fn scroll_to(&mut self, location: Location) {
		let _ = location;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
	/// Render SVG and patch it into the mounted document.
	Svg,
	/// Rasterize page by page.
	///
	/// A pass started by the pump always runs to completion, since nothing else can run while it does.
	/// To cancel between pages, drive a [`CanvasRaster`] directly with a [`canvas::cancellation`] pair.
	Canvas,
}

impl Default for RenderMode {
	fn default() -> Self {
		Self::Svg
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PumpConfig {
	pub render_mode: RenderMode,
	pub preview_mode: PreviewMode,
	pub partial_rendering: bool,
	/// Maximum number of queued render events.
	pub mailbox_capacity: usize,
	/// Delay for a deferred viewport change while no render time has been sampled yet.
	pub fallback_viewport_delay: Duration,
	pub depth_limit: usize,
	pub exhausted_reuse: ExhaustedReuse,
	pub pixel_per_pt: f64,
}

impl Default for PumpConfig {
	fn default() -> Self {
		Self {
			render_mode: RenderMode::default(),
			preview_mode: PreviewMode::default(),
			partial_rendering: false,
			mailbox_capacity: 64,
			fallback_viewport_delay: Duration::from_millis(100),
			depth_limit: crate::diff::DEFAULT_DEPTH_LIMIT,
			exhausted_reuse: ExhaustedReuse::default(),
			pixel_per_pt: 3.,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	/// No full snapshot was merged yet. Deltas and viewport changes are dropped.
	Uninitialized,
	Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpPhase {
	Idle,
	Pumping,
}

/// What a call to [`RenderPump::run_frame`] did.
#[derive(Debug)]
pub enum Frame {
	/// The mailbox was empty. The pump is [`PumpPhase::Idle`] now and post-processing ran.
	Settled,
	/// This many events were processed. Run another frame.
	Processed(usize),
	/// Processing failed. The pump is [`PumpPhase::Idle`] now and post-processing ran.
	/// Events queued behind the failing one stay queued.
	Failed(PumpError),
}

pub struct RenderPump<K, F> {
	kernel: K,
	frontend: F,
	config: PumpConfig,
	patcher: ElementPatcher,
	document: Option<Node>,
	/// Whether `document` is the slide placeholder, which is never patched.
	placeholder: bool,
	canvas: CanvasRaster,
	mailbox: VecDeque<RenderEvent>,
	deferred: Option<Instant>,
	sampled_render_time: Option<Duration>,
	session: SessionState,
	phase: PumpPhase,
	dom_state: DomState,
	/// 0-based page shown in slide mode.
	partial_page: usize,
	cursor: Option<Location>,
}

impl<K: Kernel, F: Frontend> RenderPump<K, F> {
	pub fn new(kernel: K, frontend: F, config: PumpConfig) -> Self {
		let patcher = ElementPatcher::new().with_depth_limit(config.depth_limit).with_exhausted_reuse(config.exhausted_reuse);
		let canvas = CanvasRaster::new(config.pixel_per_pt);
		let dom_state = frontend.dom_state();
		Self {
			kernel,
			frontend,
			config,
			patcher,
			document: None,
			placeholder: false,
			canvas,
			mailbox: VecDeque::new(),
			deferred: None,
			sampled_render_time: None,
			session: SessionState::Uninitialized,
			phase: PumpPhase::Idle,
			dom_state,
			partial_page: 0,
			cursor: None,
		}
	}

	/// The mounted document, if anything was mounted yet.
	pub fn document(&self) -> Option<&Node> {
		self.document.as_ref()
	}

	pub fn session(&self) -> SessionState {
		self.session
	}

	pub fn phase(&self) -> PumpPhase {
		self.phase
	}

	pub fn config(&self) -> &PumpConfig {
		&self.config
	}

	pub fn kernel(&self) -> &K {
		&self.kernel
	}

	pub fn frontend(&self) -> &F {
		&self.frontend
	}

	pub fn canvas(&self) -> &CanvasRaster {
		&self.canvas
	}

	/// Number of queued render events.
	pub fn queued(&self) -> usize {
		self.mailbox.len()
	}

	/// When the deferred viewport change becomes due, if there is one.
	pub fn deferred_until(&self) -> Option<Instant> {
		self.deferred
	}

	/// Last editor cursor position.
	pub fn cursor(&self) -> Option<Location> {
		self.cursor
	}

	/// 1-based page shown in slide mode.
	pub fn partial_page(&self) -> usize {
		self.partial_page + 1
	}

	/// Decodes and dispatches one inbound frame.
	///
	/// # Errors
	///
	/// Iff the frame is malformed or the mailbox is full.
	pub fn receive(&mut self, frame: &[u8], now: Instant) -> Result<(), PumpError> {
		match Inbound::decode(frame)? {
			Inbound::Render(event) => self.submit(event, now),
			Inbound::Cursor(location) => {
				trace!(?location, "Cursor moved.");
				self.cursor = Some(location);
				self.submit(RenderEvent::ViewportChange, now)
			}
			Inbound::Jump(location) => {
				match self.config.preview_mode {
					PreviewMode::Slide => {
						if !self.set_partial_page(location.page, now)? {
							debug!(page = location.page, "Jump target out of range.");
						}
					}
					PreviewMode::Doc => self.frontend.scroll_to(location),
				}
				Ok(())
			}
			Inbound::PartialRendering => {
				info!("Partial rendering enabled.");
				self.config.partial_rendering = true;
				Ok(())
			}
			Inbound::NotAvailable => {
				trace!("Server has nothing rendered yet.");
				Ok(())
			}
		}
	}

	/// Queues `event`.
	///
	/// A full snapshot discards everything queued before it.
	/// Any submission cancels a pending deferred viewport change.
	/// A viewport change that arrives while the pump is busy is deferred by the last sampled render time.
	///
	/// # Errors
	///
	/// [`PumpError::MailboxFull`] iff the event can neither be queued nor coalesced.
	pub fn submit(&mut self, event: RenderEvent, now: Instant) -> Result<(), PumpError> {
		if let RenderEvent::New(_) = event {
			if !self.mailbox.is_empty() {
				debug!(discarded = self.mailbox.len(), "Full snapshot supersedes queued events.");
			}
			self.mailbox.clear();
		}

		if self.deferred.take().is_some() {
			trace!("Cancelled deferred viewport change.");
		}

		if event == RenderEvent::ViewportChange && self.phase == PumpPhase::Pumping {
			let delay = self.sampled_render_time.filter(|sampled| !sampled.is_zero()).unwrap_or(self.config.fallback_viewport_delay);
			trace!(?delay, "Deferring viewport change.");
			self.deferred = Some(now + delay);
			return Ok(());
		}

		self.enqueue(event)
	}

	/// Releases the deferred viewport change if it is due.
	///
	/// Returns whether it was released.
	pub fn tick(&mut self, now: Instant) -> bool {
		match self.deferred {
			Some(due) if due <= now => {
				self.deferred = None;
				if let Err(error) = self.enqueue(RenderEvent::ViewportChange) {
					warn!("Dropping deferred viewport change: {}", error);
					return false;
				}
				true
			}
			Some(_) | None => false,
		}
	}

	/// Selects the 1-based `page` for slide mode and requests a re-render.
	///
	/// Returns `false` iff `page` doesn't exist.
	///
	/// # Errors
	///
	/// Iff the mailbox is full.
	pub fn set_partial_page(&mut self, page: usize, now: Instant) -> Result<bool, PumpError> {
		if page == 0 || page > self.kernel.pages_info().len() {
			return Ok(false);
		}
		self.partial_page = page - 1;
		self.submit(RenderEvent::ViewportChange, now)?;
		Ok(true)
	}

	fn enqueue(&mut self, event: RenderEvent) -> Result<(), PumpError> {
		if event == RenderEvent::ViewportChange && self.mailbox.back() == Some(&RenderEvent::ViewportChange) {
			trace!("Coalesced viewport change.");
		} else if self.mailbox.len() >= self.config.mailbox_capacity {
			return Err(PumpError::MailboxFull {
				capacity: self.config.mailbox_capacity,
			});
		} else {
			self.mailbox.push_back(event);
		}
		self.phase = PumpPhase::Pumping;
		Ok(())
	}

	/// Runs one frame: releases a due deferred viewport change, then drains the whole mailbox.
	#[instrument(skip(self), fields(queued = self.mailbox.len()))]
	pub fn run_frame(&mut self, now: Instant) -> Frame {
		self.tick(now);
		self.dom_state = self.frontend.dom_state();

		if self.mailbox.is_empty() {
			self.settle();
			return Frame::Settled;
		}

		let mut processed = 0;
		while let Some(event) = self.mailbox.pop_front() {
			if let Err(error) = self.process(event) {
				error!("Render event failed: {}", error);
				self.settle();
				return Frame::Failed(error);
			}
			processed += 1;
		}
		Frame::Processed(processed)
	}

	fn settle(&mut self) {
		self.phase = PumpPhase::Idle;
		self.frontend.post_process(self.document.as_ref());
	}

	fn process(&mut self, event: RenderEvent) -> Result<(), PumpError> {
		let tag = event.tag();
		let t0 = Instant::now();
		let (t1, t2, t3) = match event {
			RenderEvent::New(delta) => {
				self.kernel.reset();
				self.session = SessionState::Uninitialized;
				self.kernel.merge_delta(&delta)?;
				let t1 = Instant::now();
				let (t2, t3) = self.rerender()?;
				self.session = SessionState::Initialized;
				(t1, t2, t3)
			}
			RenderEvent::DiffV1(delta) => {
				if self.session == SessionState::Uninitialized {
					info!("Dropping {} before initialization.", tag);
					return Ok(());
				}
				self.kernel.merge_delta(&delta)?;
				let t1 = Instant::now();
				let (t2, t3) = self.rerender()?;
				(t1, t2, t3)
			}
			RenderEvent::DiffV0(markup) => {
				let target = load_markup(&markup)?;
				let t1 = Instant::now();
				self.mount_or_patch(target)?;
				(t1, t1, Instant::now())
			}
			RenderEvent::ViewportChange => {
				if self.session == SessionState::Uninitialized {
					info!("Dropping {} before initialization.", tag);
					return Ok(());
				}
				let t1 = Instant::now();
				let (t2, t3) = self.rerender()?;
				(t1, t2, t3)
			}
		};

		self.sampled_render_time = Some(t3 - t0);
		info!(
			event = tag,
			parse = ?(t1 - t0),
			check_diff = ?(t2 - t1),
			patch = ?(t3 - t2),
			total = ?(t3 - t0),
			"Frame timings."
		);
		Ok(())
	}

	/// Renders the current window and brings the mounted document (or the canvases) up to date.
	fn rerender(&mut self) -> Result<(Instant, Instant), PumpError> {
		if self.config.render_mode == RenderMode::Canvas {
			let pages = self.kernel.pages_info();
			self.canvas.sync_pages(&pages);
			let t2 = Instant::now();
			let (_, token) = canvas::cancellation();
			let outcome = self.canvas.rasterize(&mut KernelPages(&mut self.kernel), token)?;
			debug!(?outcome, "Rasterized.");
			return Ok((t2, Instant::now()));
		}

		let request = match self.config.preview_mode {
			PreviewMode::Doc => {
				let pages = if self.document.is_some() { Vec::new() } else { self.kernel.pages_info() };
				let width = viewport::doc_width(self.document.as_ref(), &pages);
				RenderRequest::Window(viewport::doc_window(self.document.as_ref(), &self.dom_state, width, self.config.partial_rendering))
			}
			PreviewMode::Slide => {
				let (request, page) = viewport::slide_window(&self.kernel.pages_info(), self.partial_page);
				self.partial_page = page;
				request
			}
		};

		match request {
			RenderRequest::Window(window) => {
				trace!(?window, "Rendering window.");
				let markup = self.kernel.render_in_window(window)?;
				let t2 = Instant::now();
				let target = load_markup(&markup)?;
				self.mount_or_patch(target)?;
				Ok((t2, Instant::now()))
			}
			RenderRequest::Placeholder(markup) => {
				let t2 = Instant::now();
				self.document = Some(load_markup(markup)?);
				self.placeholder = true;
				Ok((t2, Instant::now()))
			}
		}
	}

	fn mount_or_patch(&mut self, mut target: Node) -> Result<(), PumpError> {
		match &mut self.document {
			Some(document) if !self.placeholder => {
				let report = self.patcher.patch_root(document, target)?;
				debug!(?report, "Patched.");
			}
			Some(_) | None => {
				debug!(nodes = target.subtree_len(), placeholder = self.placeholder, "Mounting.");
				target.forget_reuse_hints();
				self.document = Some(target);
				self.placeholder = false;
			}
		}
		Ok(())
	}
}

/// Adapts the kernel's page rendering for the canvas raster.
struct KernelPages<'a, K>(&'a mut K);

impl<K: Kernel> Rasterizer for KernelPages<'_, K> {
	fn render_page(&mut self, page: PageRaster<'_>) -> Result<String, KernelError> {
		self.0.render_canvas_page(page)
	}
}
