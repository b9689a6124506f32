use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use std::path::Path;

use ie::{AssetStore, Frame, Input, Matcher, PageResolver, Region, ScaleState, ScreenCapture, StateFile, TransitionTable};
use image::RgbImage;

use super::Ctx;
use crate::config::Config;

pub struct StillScreen(pub RgbImage);

impl ScreenCapture for StillScreen {
	fn capture(&mut self, region: Option<Region>) -> anyhow::Result<Frame> {
		let frame = Frame::new((0, 0), self.0.clone());
		match region {
			Some(region) => frame.crop(region).ok_or_else(|| anyhow::anyhow!("off screen")),
			None => Ok(frame),
		}
	}

	fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
		Ok(self.0.dimensions())
	}
}

pub type Log = Rc<RefCell<Vec<String>>>;

/// Screen drawn from the input log, so it reacts to earlier clicks.
pub struct Scripted {
	pub log: Log,
	pub scene: Box<dyn Fn(&[String]) -> RgbImage>,
}

impl ScreenCapture for Scripted {
	fn capture(&mut self, region: Option<Region>) -> anyhow::Result<Frame> {
		let image = (self.scene)(&self.log.borrow());
		StillScreen(image).capture(region)
	}

	fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
		Ok((self.scene)(&self.log.borrow()).dimensions())
	}
}

pub struct Recorder(pub Log);

impl Input for Recorder {
	fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		self.0.borrow_mut().push(format!("move {x},{y}"));
		Ok(())
	}

	fn click(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		self.0.borrow_mut().push(format!("click {x},{y}"));
		Ok(())
	}

	fn press(&mut self, key: &str) -> anyhow::Result<()> {
		self.0.borrow_mut().push(format!("press {key}"));
		Ok(())
	}

	fn hotkey(&mut self, keys: &[String]) -> anyhow::Result<()> {
		self.0.borrow_mut().push(format!("hotkey {}", keys.join("+")));
		Ok(())
	}

	fn cursor(&mut self) -> anyhow::Result<(i32, i32)> {
		Ok((0, 0))
	}
}

/// Context over a still screen with an empty asset tree.
pub fn ctx(screen: RgbImage, config: Config) -> (Ctx, Log) {
	let log = Log::default();
	let ctx = ctx_with(Box::new(StillScreen(screen)), log.clone(), Path::new("/nonexistent/tdsheep-assets"), config);
	(ctx, log)
}

/// Context over any screen and asset root; input is recorded into `log`.
pub fn ctx_with(screen: Box<dyn ScreenCapture>, log: Log, assets: &Path, config: Config) -> Ctx {
	let matcher = Matcher::new(AssetStore::new(assets), screen);
	let resolver = PageResolver::new(matcher, Box::new(Recorder(log)) as Box<dyn Input>, TransitionTable::default());
	Ctx::new(
		resolver,
		StateFile::in_memory(ScaleState::default()),
		config,
		Arc::new(AtomicBool::new(false)),
	)
}

/// Deterministic per-pixel noise.
pub fn textured(width: u32, height: u32, seed: u32) -> RgbImage {
	RgbImage::from_fn(width, height, |x, y| {
		let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ seed.wrapping_mul(0xC2B2_AE3D);
		h ^= h >> 15;
		h = h.wrapping_mul(0x2C1B_3C6D);
		h ^= h >> 13;
		image::Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
	})
}
