//! Known navigation procedures between pages.
//!
//! The table is deliberately partial. A missing `(from, to)` entry means the
//! route is unknown, which callers must treat differently from a route that
//! was tried and did not arrive.

use std::collections::HashMap;
use std::time::Duration;

use crate::PageId;

/// Group holding the navigation buttons clicked by the built-in routes.
pub const NAV_GROUP: &str = "nav";

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
	/// Locate an asset (adaptive scale) and click its center.
	ClickAsset { group: String, stem: String },
	ClickAt { x: i32, y: i32 },
	Press(String),
	Hotkey(Vec<String>),
	Wait(Duration),
}

impl Step {
	pub fn click_asset(group: &str, stem: &str) -> Self {
		Self::ClickAsset {
			group: group.to_string(),
			stem: stem.to_string(),
		}
	}

	pub fn press(key: &str) -> Self {
		Self::Press(key.to_string())
	}

	pub fn wait_secs(secs: f32) -> Self {
		Self::Wait(Duration::from_secs_f32(secs))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
	#[error("no transition path from {from} to {to}")]
	NoPath { from: PageId, to: PageId },
}

#[derive(Debug, Clone)]
pub struct TransitionTable {
	baseline: PageId,
	refresh: Vec<Step>,
	routes: HashMap<(PageId, PageId), Vec<Step>>,
}

impl Default for TransitionTable {
	fn default() -> Self {
		let mut table = Self::new(
			PageId::Home,
			vec![
				Step::press("escape"),
				Step::click_asset(NAV_GROUP, "home"),
				Step::wait_secs(3.0),
			],
		);
		for (to, stem) in [
			(PageId::Frontline, "frontline"),
			(PageId::DefenseLine, "defenseline"),
			(PageId::WolfPack, "wolfpack"),
		] {
			table.insert(PageId::Home, to, vec![Step::click_asset(NAV_GROUP, stem), Step::wait_secs(2.0)]);
		}
		table.insert(PageId::Frontline, PageId::Home, vec![Step::press("escape"), Step::wait_secs(1.5)]);
		table
	}
}

impl TransitionTable {
	/// Empty table. `refresh` is the recovery gesture that should leave the UI on `baseline`.
	pub fn new(baseline: PageId, refresh: Vec<Step>) -> Self {
		Self {
			baseline,
			refresh,
			routes: HashMap::new(),
		}
	}

	pub fn baseline(&self) -> PageId {
		self.baseline
	}

	pub fn refresh(&self) -> &[Step] {
		&self.refresh
	}

	pub fn insert(&mut self, from: PageId, to: PageId, steps: Vec<Step>) {
		self.routes.insert((from, to), steps);
	}

	/// Steps leading from `from` to `to`. Staying put needs no steps.
	pub fn lookup(&self, from: PageId, to: PageId) -> Result<&[Step], TransitionError> {
		if from == to {
			return Ok(&[]);
		}
		self.routes
			.get(&(from, to))
			.map(Vec::as_slice)
			.ok_or(TransitionError::NoPath { from, to })
	}
}
