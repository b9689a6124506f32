//! Pixel grids handed between screen capture and the match engine.
//!
//! A capture is always normalized to an RGB [`Frame`] (no alpha, fixed channel
//! order) that remembers where its top-left pixel sits on the screen, so match
//! positions can be reported in screen coordinates no matter which region was
//! grabbed.

use anyhow::{Context, Result};
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Rectangle in screen pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
	pub left: i32,
	pub top: i32,
	pub width: u32,
	pub height: u32,
}

impl Region {
	pub const fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
		Self { left, top, width, height }
	}

	#[inline]
	pub fn right(&self) -> i32 {
		self.left + self.width as i32
	}

	#[inline]
	pub fn bottom(&self) -> i32 {
		self.top + self.height as i32
	}

	/// Rectangle spanned by two corner points, in either order.
	pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
		Self {
			left: a.0.min(b.0),
			top: a.1.min(b.1),
			width: a.0.abs_diff(b.0),
			height: a.1.abs_diff(b.1),
		}
	}

	pub fn intersect(&self, other: &Region) -> Option<Region> {
		let left = self.left.max(other.left);
		let top = self.top.max(other.top);
		let right = self.right().min(other.right());
		let bottom = self.bottom().min(other.bottom());
		if right <= left || bottom <= top {
			return None;
		}
		Some(Region::new(left, top, (right - left) as u32, (bottom - top) as u32))
	}
}

/// Captured screen pixels plus the screen position of pixel (0, 0).
#[derive(Clone, Debug)]
pub struct Frame {
	origin: (i32, i32),
	pixels: RgbImage,
}

impl Frame {
	pub fn new(origin: (i32, i32), pixels: RgbImage) -> Self {
		Self { origin, pixels }
	}

	/// Build a frame from tightly packed RGBA bytes (alpha is discarded).
	///
	/// `bytes` must hold `width * height * 4` bytes for some whole `height`.
	pub fn from_rgba(origin: (i32, i32), width: u32, bytes: &[u8]) -> Result<Self> {
		let stride = width as usize * 4;
		anyhow::ensure!(stride > 0, "zero-width capture");
		anyhow::ensure!(bytes.len() % stride == 0, "capture buffer is not a whole number of rows");
		let height = (bytes.len() / stride) as u32;
		let rgb = bytes
			.chunks_exact(4)
			.flat_map(|v| [v[0], v[1], v[2]])
			.collect::<Vec<_>>();
		let pixels = RgbImage::from_raw(width, height, rgb).context("RgbImage::from_raw failed")?;
		Ok(Self { origin, pixels })
	}

	#[inline]
	pub fn origin(&self) -> (i32, i32) {
		self.origin
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.pixels.width()
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.pixels.height()
	}

	#[inline]
	pub fn rgb(&self) -> &RgbImage {
		&self.pixels
	}

	/// Screen rectangle covered by this frame.
	pub fn bounds(&self) -> Region {
		Region::new(self.origin.0, self.origin.1, self.width(), self.height())
	}

	/// Grayscale reduction used for both captures and templates.
	pub fn to_luma8(&self) -> GrayImage {
		to_luma8(&self.pixels)
	}

	/// Copy out the part of this frame that lies inside `region` (screen coordinates).
	///
	/// Returns `None` when the region does not overlap the frame at all.
	pub fn crop(&self, region: Region) -> Option<Frame> {
		let area = self.bounds().intersect(&region)?;
		let x = (area.left - self.origin.0) as u32;
		let y = (area.top - self.origin.1) as u32;
		let pixels = image::imageops::crop_imm(&self.pixels, x, y, area.width, area.height).to_image();
		Some(Frame {
			origin: (area.left, area.top),
			pixels,
		})
	}

	pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
		}
		self.pixels
			.save_with_format(path, image::ImageFormat::Png)
			.with_context(|| format!("save png {:?}", path))
	}
}

/// Integer luma with the BT.601 weights.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
	((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

pub fn to_luma8(rgb: &RgbImage) -> GrayImage {
	GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
		let [r, g, b] = rgb.get_pixel(x, y).0;
		Luma([luma(r, g, b)])
	})
}
