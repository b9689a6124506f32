//! Fakes shared by the unit tests.

use image::{Rgb, RgbImage};

use crate::{Frame, Region, ScreenCapture};

/// Deterministic per-pixel noise; every `seed` gives an unrelated texture.
pub fn textured(width: u32, height: u32, seed: u32) -> RgbImage {
	RgbImage::from_fn(width, height, |x, y| {
		let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ seed.wrapping_mul(0xC2B2_AE3D);
		h ^= h >> 15;
		h = h.wrapping_mul(0x2C1B_3C6D);
		h ^= h >> 12;
		h = h.wrapping_mul(0x297A_2D39);
		h ^= h >> 15;
		Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
	})
}

/// Always serves the same frame.
pub struct FixedScreen {
	frame: Frame,
	pub captures: usize,
}

impl FixedScreen {
	pub fn new(frame: Frame) -> Self {
		Self { frame, captures: 0 }
	}
}

impl ScreenCapture for FixedScreen {
	fn capture(&mut self, region: Option<Region>) -> anyhow::Result<Frame> {
		self.captures += 1;
		match region {
			Some(region) => self.frame.crop(region).ok_or_else(|| anyhow::anyhow!("region off screen")),
			None => Ok(self.frame.clone()),
		}
	}

	fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
		Ok((self.frame.width(), self.frame.height()))
	}
}
