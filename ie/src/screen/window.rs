//! Game window detection.
//!
//! The window is found by its fixed UI chrome (group `a`): the friend switch
//! bottom-left, the UI cluster bottom-right and the top and bottom menus. All
//! four must be visible for the batch to pass. The window rectangle is then
//! derived from the anchor landmark and the detected scale.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::page::close_batch;
use crate::scale::{scaled, snap_scale};
use crate::{MatchResult, Matcher, Probe, Region, ScreenCapture, StateFile};

pub const WINDOW_GROUP: &str = "a";

/// Window size at 100% scale.
pub const BASE_WINDOW_SIZE: (u32, u32) = (1066, 912);

/// Distance from the anchor's top-left to the window's top-left at 100%.
const TOP_MENU_OFFSET: (i32, i32) = (1, 42);

/// One required landmark; any of `stems` satisfies it (checked in order).
#[derive(Debug)]
pub struct Slot {
	pub name: &'static str,
	pub stems: &'static [&'static str],
}

pub static WINDOW_SLOTS: [Slot; 4] = [
	// grey or lit
	Slot {
		name: "friend_switch",
		stems: &["a_5", "a_6"],
	},
	Slot {
		name: "ui",
		stems: &["a_3", "a_4"],
	},
	Slot {
		name: "a_1",
		stems: &["a_1"],
	},
	Slot {
		name: "a_2",
		stems: &["a_2"],
	},
];

#[derive(Debug, Clone, PartialEq)]
pub struct SlotMatch {
	pub slot: &'static str,
	/// The alternative that matched.
	pub stem: &'static str,
	pub scale: u32,
	pub result: MatchResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowDetection {
	pub success: bool,
	pub matches: Vec<SlotMatch>,
	/// Slots with no visible alternative.
	pub missing: Vec<&'static str>,
	pub recommended_scale: u32,
	/// Set after a failed batch.
	pub advised_wait: Option<Duration>,
}

impl WindowDetection {
	/// Match for a given asset stem, whichever slot it filled.
	pub fn get(&self, stem: &str) -> Option<&SlotMatch> {
		self.matches.iter().find(|m| m.stem == stem)
	}
}

/// Look for the window chrome in one capture of `probe.region`.
///
/// Each hit promotes its scale immediately, so later slots try it first.
pub fn detect_window<C: ScreenCapture>(matcher: &mut Matcher<C>, state: &mut StateFile, probe: &Probe) -> WindowDetection {
	let frame = matcher.grab(probe.region);

	let mut matches = Vec::with_capacity(WINDOW_SLOTS.len());
	let mut missing = Vec::new();
	for slot in &WINDOW_SLOTS {
		let hit = frame.as_ref().and_then(|frame| {
			slot.stems.iter().find_map(|&stem| {
				let located = matcher.locate_in(frame, state, WINDOW_GROUP, stem, probe);
				Some(SlotMatch {
					slot: slot.name,
					stem,
					scale: located.scale?,
					result: located.result?,
				})
			})
		});
		match hit {
			Some(m) => matches.push(m),
			None => {
				tracing::warn!(slot = slot.name, "window landmark not found; adjust the game window and retry");
				missing.push(slot.name);
			}
		}
	}

	let success = missing.is_empty();
	let advised_wait = close_batch(state, success, "window");
	WindowDetection {
		success,
		matches,
		missing,
		recommended_scale: state.recommended_scale(),
		advised_wait,
	}
}

/// Where the window sits relative to its anchor landmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowLayout {
	pub anchor: String,
	/// Extra correction at 100%, on top of the built-in menu offset.
	pub anchor_offset: (i32, i32),
	pub base_size: (u32, u32),
}

impl Default for WindowLayout {
	fn default() -> Self {
		Self {
			anchor: "a_2".to_string(),
			anchor_offset: (0, 0),
			base_size: BASE_WINDOW_SIZE,
		}
	}
}

/// Screen rectangle of the game window, clamped to a `screen` of the given size.
///
/// `None` when the anchor landmark is not among `matches`.
pub fn window_geometry(matches: &[SlotMatch], scale: u32, layout: &WindowLayout, screen: (u32, u32)) -> Option<Region> {
	let Some(anchor) = matches.iter().find(|m| m.stem == layout.anchor) else {
		tracing::warn!(anchor = %layout.anchor, "anchor not matched; cannot place window");
		return None;
	};
	let scale = snap_scale(scale as i64);

	let left = anchor.result.left + scaled(layout.anchor_offset.0, scale) + scaled(TOP_MENU_OFFSET.0, scale);
	let top = anchor.result.top + scaled(layout.anchor_offset.1, scale) + scaled(TOP_MENU_OFFSET.1, scale);
	let width = scaled(layout.base_size.0 as i32, scale);
	let height = scaled(layout.base_size.1 as i32, scale);

	let (sw, sh) = (screen.0 as i32, screen.1 as i32);
	let left = left.clamp(0, (sw - 1).max(0));
	let top = top.clamp(0, (sh - 1).max(0));
	let width = width.clamp(1, (sw - left).max(1));
	let height = height.clamp(1, (sh - top).max(1));

	let rect = Region::new(left, top, width as u32, height as u32);
	tracing::info!(?rect, scale, "window placed");
	Some(rect)
}
