mod arena;
pub use arena::Arena;

mod defense;
pub use defense::Defense;

#[cfg(test)]
pub(crate) mod fakes;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ie::{ColorMode, Input, MatchResult, PageResolver, Probe, Region, ScreenCapture, StateFile};

use crate::config::Config;

pub type Resolver = PageResolver<Box<dyn ScreenCapture>, Box<dyn Input>>;

/// A long-running automation built on the page and match primitives.
pub trait Module {
	fn name(&self) -> &'static str;

	/// Run until done, stopped, or failed. Stop requests are honored between detections.
	fn run(&mut self, ctx: &mut Ctx) -> anyhow::Result<()>;
}

/// Everything a module touches.
pub struct Ctx {
	pub resolver: Resolver,
	pub state: StateFile,
	pub config: Config,
	stop: Arc<AtomicBool>,
}

/// Longest uninterrupted sleep inside [`Ctx::pause`].
const PAUSE_SLICE: Duration = Duration::from_millis(100);

impl Ctx {
	pub fn new(resolver: Resolver, state: StateFile, config: Config, stop: Arc<AtomicBool>) -> Self {
		Self { resolver, state, config, stop }
	}

	pub fn stopped(&self) -> bool {
		self.stop.load(Ordering::Relaxed)
	}

	/// Sleep for `d`. Returns false as soon as a stop is requested.
	pub fn pause(&self, d: Duration) -> bool {
		let deadline = Instant::now() + d;
		while !self.stopped() {
			let now = Instant::now();
			if now >= deadline {
				return true;
			}
			std::thread::sleep((deadline - now).min(PAUSE_SLICE));
		}
		false
	}

	/// Default probe: configured confidence, grayscale, full screen.
	pub fn probe(&self) -> Probe {
		Probe::with_confidence(self.config.confidence)
	}

	/// Adaptive-scale lookup of an asset; the scale is returned with the hit.
	pub fn find(&mut self, group: &str, stem: &str, probe: &Probe) -> Option<(MatchResult, u32)> {
		let located = self.resolver.matcher_mut().locate_with_adaptive_scale(&mut self.state, group, stem, probe);
		Some((located.result?, located.scale?))
	}

	/// Poll for an asset up to `attempts` times, `every` apart.
	pub fn wait_for(&mut self, group: &str, stem: &str, probe: &Probe, attempts: u32, every: Duration) -> Option<(MatchResult, u32)> {
		for attempt in 1..=attempts {
			if let Some(hit) = self.find(group, stem, probe) {
				return Some(hit);
			}
			if attempt < attempts && !self.pause(every) {
				break;
			}
		}
		None
	}

	/// Click an asset's center if it is on screen.
	pub fn click_asset(&mut self, group: &str, stem: &str, probe: &Probe) -> anyhow::Result<bool> {
		Ok(self.resolver.click_asset(&mut self.state, group, stem, probe)?.is_some())
	}

	pub fn click(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		self.resolver.input_mut().click(x, y)
	}

	pub fn hotkey(&mut self, keys: &[String]) -> anyhow::Result<()> {
		if keys.is_empty() {
			return Ok(());
		}
		self.resolver.input_mut().hotkey(keys)
	}

	/// Match a standalone template file from the config (single scale).
	pub fn find_file(&mut self, path: &Option<PathBuf>, region: Option<Region>, threshold: f32) -> Option<MatchResult> {
		let path = self.config.resolve(path.as_deref()?);
		if !path.is_file() {
			return None;
		}
		let template = ie::load_template(&path, ColorMode::Grayscale)?;
		let frame = self.resolver.matcher_mut().grab(region)?;
		ie::locate(&frame, &template, threshold)
	}
}

/// Seconds from the config as a duration; nonsense values become zero.
pub fn secs(value: f32) -> Duration {
	Duration::try_from_secs_f32(value.max(0.0)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn config_seconds_never_panic() {
		assert_eq!(secs(1.5), Duration::from_millis(1500));
		assert_eq!(secs(-3.0), Duration::ZERO);
		assert_eq!(secs(f32::NAN), Duration::ZERO);
		assert_eq!(secs(f32::INFINITY), Duration::ZERO);
	}

	#[test]
	fn pause_returns_early_once_stopped() {
		let (ctx, _log) = fakes::ctx(image::RgbImage::new(8, 8), Config::default());
		assert!(ctx.pause(Duration::from_millis(1)));

		ctx.stop.store(true, Ordering::Relaxed);
		let start = Instant::now();
		assert!(!ctx.pause(Duration::from_secs(30)));
		assert!(start.elapsed() < Duration::from_secs(1));
	}
}
