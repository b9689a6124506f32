//! Page model: which screen the game UI is on, and how to get somewhere else.
//!
//! A page is recognized when every one of its landmark assets is visible in a
//! single capture. Pages are data ([`PAGES`]); adding one means adding a row
//! and, optionally, transition entries.

use std::fmt;
use std::time::Duration;

use crate::transition::{Step, TransitionError, TransitionTable};
use crate::{ColorMode, DEFAULT_CONFIDENCE, Frame, Input, MatchResult, Matcher, Probe, ScreenCapture, StateFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageId {
	Home,
	Frontline,
	DefenseLine,
	WolfPack,
}

impl PageId {
	pub const ALL: [PageId; 4] = [PageId::Home, PageId::Frontline, PageId::DefenseLine, PageId::WolfPack];

	pub fn name(self) -> &'static str {
		match self {
			PageId::Home => "HOME",
			PageId::Frontline => "FRONTLINE",
			PageId::DefenseLine => "DEFENSE_LINE",
			PageId::WolfPack => "WOLF_PACK",
		}
	}

	/// Parse a page name, ignoring case, `_` and `-` (`"wolf-pack"`, `"WOLF_PACK"`).
	pub fn from_name(name: &str) -> Option<Self> {
		let wanted = normalize(name);
		Self::ALL.into_iter().find(|p| normalize(p.name()) == wanted)
	}

	pub fn def(self) -> &'static PageDef {
		// PAGES is ordered like ALL.
		&PAGES[self as usize]
	}
}

fn normalize(name: &str) -> String {
	name.chars()
		.filter(|c| !matches!(c, '_' | '-' | ' '))
		.map(|c| c.to_ascii_lowercase())
		.collect()
}

impl fmt::Display for PageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug)]
pub struct PageDef {
	pub id: PageId,
	/// Asset folder holding the landmarks.
	pub group: &'static str,
	/// Landmarks that must all be visible, checked in this order.
	pub required: &'static [&'static str],
	pub mode: ColorMode,
}

pub static PAGES: [PageDef; 4] = [
	PageDef {
		id: PageId::Home,
		group: "page_home",
		required: &["1", "2"],
		mode: ColorMode::Grayscale,
	},
	PageDef {
		id: PageId::Frontline,
		group: "page_frontline",
		required: &["1", "2", "3", "4", "5", "6"],
		mode: ColorMode::Grayscale,
	},
	PageDef {
		id: PageId::DefenseLine,
		group: "page_defenseline",
		required: &["1"],
		mode: ColorMode::Grayscale,
	},
	PageDef {
		id: PageId::WolfPack,
		group: "page_wolfpack",
		required: &["1", "2", "3"],
		mode: ColorMode::Grayscale,
	},
];

/// Why [`PageResolver::ensure_page_report`] gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnsureError {
	/// The route is unknown. Retrying cannot help.
	#[error(transparent)]
	NoTransition(#[from] TransitionError),
	/// Navigation ran but the page never showed up.
	#[error("{page} not reached after {attempts} attempt(s)")]
	NotReached { page: PageId, attempts: u32 },
}

/// A navigation step that could not be carried out.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
	#[error("{group}/{stem} not found on screen")]
	NotFound { group: String, stem: String },
	#[error("input failed: {0:#}")]
	Input(#[from] anyhow::Error),
}

pub struct PageResolver<C, I> {
	matcher: Matcher<C>,
	input: I,
	transitions: TransitionTable,
	confidence: f32,
}

impl<C: ScreenCapture, I: Input> PageResolver<C, I> {
	pub fn new(matcher: Matcher<C>, input: I, transitions: TransitionTable) -> Self {
		Self {
			matcher,
			input,
			transitions,
			confidence: DEFAULT_CONFIDENCE,
		}
	}

	/// Confidence used for landmarks and navigation clicks.
	pub fn with_confidence(mut self, confidence: f32) -> Self {
		self.confidence = confidence;
		self
	}

	pub fn confidence(&self) -> f32 {
		self.confidence
	}

	pub fn matcher(&self) -> &Matcher<C> {
		&self.matcher
	}

	pub fn matcher_mut(&mut self) -> &mut Matcher<C> {
		&mut self.matcher
	}

	pub fn input_mut(&mut self) -> &mut I {
		&mut self.input
	}

	pub fn transitions(&self) -> &TransitionTable {
		&self.transitions
	}

	pub fn transitions_mut(&mut self) -> &mut TransitionTable {
		&mut self.transitions
	}

	/// True iff every landmark of `page` is visible in one fresh capture.
	///
	/// This is one detection batch: `fail_count` is reset or bumped afterwards.
	pub fn is_page(&mut self, state: &mut StateFile, page: PageId) -> bool {
		let visible = match self.matcher.grab(None) {
			Some(frame) => self.page_visible(&frame, state, page),
			None => false,
		};
		close_batch(state, visible, page.name());
		visible
	}

	/// First page of `order` whose landmarks are all visible.
	///
	/// Landmark sets may overlap, so the answer depends on `order`; the resolver
	/// itself does not rank pages. One capture, one batch.
	pub fn classify(&mut self, state: &mut StateFile, order: &[PageId]) -> Option<PageId> {
		let found = self
			.matcher
			.grab(None)
			.and_then(|frame| order.iter().copied().find(|&page| self.page_visible(&frame, state, page)));
		close_batch(state, found.is_some(), "classify");
		if let Some(page) = found {
			tracing::info!(%page, "current page");
		}
		found
	}

	fn page_visible(&self, frame: &Frame, state: &mut StateFile, page: PageId) -> bool {
		let def = page.def();
		if !self.matcher.store().has_group(def.group) {
			tracing::warn!(%page, group = def.group, "asset directory missing");
			return false;
		}
		let probe = Probe {
			confidence: self.confidence,
			mode: def.mode,
			region: None,
		};
		for stem in def.required {
			if !self.matcher.locate_in(frame, state, def.group, stem, &probe).is_hit() {
				tracing::debug!(%page, stem, "landmark missing");
				return false;
			}
		}
		true
	}

	/// Make sure the UI shows `target`, navigating there if needed.
	pub fn ensure_page(&mut self, state: &mut StateFile, target: PageId, max_retries: u32, retry_interval: Duration) -> bool {
		self.ensure_page_report(state, target, max_retries, retry_interval).is_ok()
	}

	/// [`Self::ensure_page`] with the reason for failure.
	///
	/// Each cycle is refresh, jump from the baseline page, check. There are
	/// `max_retries + 1` cycles at most, separated by `retry_interval`. An
	/// unknown route fails before anything is clicked.
	pub fn ensure_page_report(
		&mut self,
		state: &mut StateFile,
		target: PageId,
		max_retries: u32,
		retry_interval: Duration,
	) -> Result<(), EnsureError> {
		if self.is_page(state, target) {
			tracing::info!(page = %target, "already on page");
			return Ok(());
		}

		let baseline = self.transitions.baseline();
		let route = match self.transitions.lookup(baseline, target) {
			Ok(steps) => steps.to_vec(),
			Err(err) => {
				tracing::warn!(%err, "cannot navigate");
				return Err(err.into());
			}
		};
		tracing::info!(page = %target, "not on page; navigating");

		let attempts = max_retries.saturating_add(1);
		for attempt in 1..=attempts {
			if attempt > 1 {
				std::thread::sleep(retry_interval);
			}
			if let Err(err) = self.refresh(state) {
				tracing::warn!(%err, attempt, "refresh incomplete");
			}
			if let Err(err) = self.run_steps(state, &route) {
				tracing::warn!(%err, attempt, "jump incomplete");
			}
			if self.is_page(state, target) {
				tracing::info!(page = %target, attempt, "page reached");
				return Ok(());
			}
			tracing::info!(page = %target, attempt, attempts, "page check failed");
		}

		tracing::warn!(page = %target, attempts, "unable to reach page");
		Err(EnsureError::NotReached { page: target, attempts })
	}

	/// Run the recovery gesture that should land on the baseline page.
	pub fn refresh(&mut self, state: &mut StateFile) -> Result<(), StepError> {
		let steps = self.transitions.refresh().to_vec();
		self.run_steps(state, &steps)
	}

	/// Execute `steps` in order, stopping at the first one that fails.
	pub fn run_steps(&mut self, state: &mut StateFile, steps: &[Step]) -> Result<(), StepError> {
		for step in steps {
			tracing::debug!(?step, "step");
			match step {
				Step::ClickAsset { group, stem } => {
					let probe = Probe::with_confidence(self.confidence);
					if self.click_asset(state, group, stem, &probe)?.is_none() {
						return Err(StepError::NotFound {
							group: group.clone(),
							stem: stem.clone(),
						});
					}
				}
				Step::ClickAt { x, y } => self.input.click(*x, *y)?,
				Step::Press(key) => self.input.press(key)?,
				Step::Hotkey(keys) => self.input.hotkey(keys)?,
				Step::Wait(d) => std::thread::sleep(*d),
			}
		}
		Ok(())
	}

	/// Locate `group/stem` with the adaptive scale and click its center.
	///
	/// `Ok(None)` when the asset is not on screen.
	pub fn click_asset(&mut self, state: &mut StateFile, group: &str, stem: &str, probe: &Probe) -> anyhow::Result<Option<MatchResult>> {
		let located = self.matcher.locate_with_adaptive_scale(state, group, stem, probe);
		let Some(m) = located.result else {
			return Ok(None);
		};
		self.input.click(m.center.0, m.center.1)?;
		Ok(Some(m))
	}
}

/// Record the outcome of one detection batch and log the advised wait.
pub(crate) fn close_batch(state: &mut StateFile, success: bool, what: &str) -> Option<Duration> {
	let wait = state.record_batch(success);
	if let Some(wait) = wait {
		tracing::warn!(
			batch = what,
			fail_count = state.state().fail_count,
			"detection failed; wait {:.1}s before retrying",
			wait.as_secs_f32()
		);
	}
	wait
}
