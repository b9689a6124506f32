#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use ie::{Frame, Input, Region, ScreenCapture};
use image::{Rgb, RgbImage};

pub fn textured(width: u32, height: u32, seed: u32) -> RgbImage {
	RgbImage::from_fn(width, height, |x, y| {
		let mut h = x.wrapping_mul(0x27D4_EB2F) ^ y.wrapping_mul(0x1656_67B1) ^ seed.wrapping_mul(0x9E37_79B9);
		h ^= h >> 16;
		h = h.wrapping_mul(0x85EB_CA6B);
		h ^= h >> 13;
		h = h.wrapping_mul(0xC2B2_AE35);
		h ^= h >> 16;
		Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
	})
}

/// Save the `w`×`h` block of `screen` at (x, y) as `<root>/<group>/<file>`.
pub fn cut_asset(root: &Path, group: &str, file: &str, screen: &RgbImage, (x, y): (u32, u32), (w, h): (u32, u32)) {
	let dir = root.join(group);
	std::fs::create_dir_all(&dir).unwrap();
	image::imageops::crop_imm(screen, x, y, w, h)
		.to_image()
		.save(dir.join(file))
		.unwrap();
}

/// Everything the fake input device was asked to do.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
	pub fn push(&self, entry: String) {
		self.0.borrow_mut().push(entry);
	}

	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.borrow().clone()
	}
}

/// Shows `before` until the input log has `switch_after` entries, then `after`.
pub struct Scripted {
	pub before: RgbImage,
	pub after: RgbImage,
	pub switch_after: usize,
	pub log: Log,
	pub captures: usize,
}

impl Scripted {
	pub fn still(screen: RgbImage) -> Self {
		Self {
			before: screen.clone(),
			after: screen,
			switch_after: usize::MAX,
			log: Log::default(),
			captures: 0,
		}
	}

	pub fn current(&self) -> &RgbImage {
		if self.log.len() >= self.switch_after { &self.after } else { &self.before }
	}
}

impl ScreenCapture for Scripted {
	fn capture(&mut self, region: Option<Region>) -> anyhow::Result<Frame> {
		self.captures += 1;
		let frame = Frame::new((0, 0), self.current().clone());
		match region {
			Some(region) => frame.crop(region).ok_or_else(|| anyhow::anyhow!("off screen")),
			None => Ok(frame),
		}
	}

	fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
		Ok(self.current().dimensions())
	}
}

pub struct Recorder {
	pub log: Log,
	pub cursor: (i32, i32),
}

impl Recorder {
	pub fn new(log: Log) -> Self {
		Self { log, cursor: (0, 0) }
	}
}

impl Input for Recorder {
	fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		self.cursor = (x, y);
		Ok(())
	}

	fn click(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		self.cursor = (x, y);
		self.log.push(format!("click {x},{y}"));
		Ok(())
	}

	fn press(&mut self, key: &str) -> anyhow::Result<()> {
		self.log.push(format!("press {key}"));
		Ok(())
	}

	fn hotkey(&mut self, keys: &[String]) -> anyhow::Result<()> {
		self.log.push(format!("hotkey {}", keys.join("+")));
		Ok(())
	}

	fn cursor(&mut self) -> anyhow::Result<(i32, i32)> {
		Ok(self.cursor)
	}
}
