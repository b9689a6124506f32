//! Template asset lookup.
//!
//! Assets live in one folder per group, each variant named `<stem>_<scale>.png`.
//! A bare `<stem>.png` is accepted as the 100% variant for older asset sets.
//! Variants are expected to be partially populated, so a missing file is a
//! normal answer here, not an error.

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};

use crate::ColorMode;

#[derive(Debug, Clone)]
pub struct AssetStore {
	root: PathBuf,
}

impl AssetStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn group_dir(&self, group: &str) -> PathBuf {
		self.root.join(group)
	}

	pub fn has_group(&self, group: &str) -> bool {
		self.group_dir(group).is_dir()
	}

	/// Path of the `scale` variant of `group/stem`, if it exists on disk.
	pub fn resolve(&self, group: &str, stem: &str, scale: u32) -> Option<PathBuf> {
		let dir = self.group_dir(group);
		let path = dir.join(format!("{stem}_{scale}.png"));
		if path.is_file() {
			return Some(path);
		}
		if scale == 100 {
			let legacy = dir.join(format!("{stem}.png"));
			if legacy.is_file() {
				return Some(legacy);
			}
		}
		None
	}

	/// Resolve and decode in one go.
	pub fn template(&self, group: &str, stem: &str, scale: u32, mode: ColorMode) -> Option<Template> {
		let path = self.resolve(group, stem, scale)?;
		load_template(&path, mode)
	}
}

#[derive(Debug, Clone)]
pub enum Pixels {
	Gray(GrayImage),
	Color(RgbImage),
}

/// A decoded reference image, read-only once loaded.
#[derive(Debug, Clone)]
pub struct Template {
	pub name: String,
	pub pixels: Pixels,
}

impl Template {
	pub fn from_rgb(name: impl Into<String>, rgb: RgbImage, mode: ColorMode) -> Self {
		let pixels = match mode {
			ColorMode::Grayscale => Pixels::Gray(crate::frame::to_luma8(&rgb)),
			ColorMode::Color => Pixels::Color(rgb),
		};
		Self { name: name.into(), pixels }
	}

	pub fn mode(&self) -> ColorMode {
		match self.pixels {
			Pixels::Gray(_) => ColorMode::Grayscale,
			Pixels::Color(_) => ColorMode::Color,
		}
	}

	pub fn dimensions(&self) -> (u32, u32) {
		match &self.pixels {
			Pixels::Gray(img) => img.dimensions(),
			Pixels::Color(img) => img.dimensions(),
		}
	}
}

/// Decode a template from disk. Unreadable files are logged and reported as absent.
pub fn load_template(path: &Path, mode: ColorMode) -> Option<Template> {
	let decoded = match image::open(path) {
		Ok(img) => img,
		Err(err) => {
			tracing::warn!(path = %path.display(), error = %err, "failed to decode template");
			return None;
		}
	};
	let name = path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default();
	Some(Template::from_rgb(name, decoded.to_rgb8(), mode))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::SCALES;

	fn touch_png(path: &Path) {
		RgbImage::from_pixel(4, 3, image::Rgb([9, 9, 9])).save(path).unwrap();
	}

	#[test]
	fn resolves_exactly_the_variants_on_disk() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("a")).unwrap();
		touch_png(&dir.path().join("a/home_67.png"));
		touch_png(&dir.path().join("a/home_110.png"));

		let store = AssetStore::new(dir.path());
		for s in SCALES {
			let found = store.resolve("a", "home", s);
			assert_eq!(found.is_some(), s == 67 || s == 110, "scale {s}");
		}
		assert_eq!(store.resolve("a", "home", 67).unwrap(), dir.path().join("a/home_67.png"));
		assert!(store.resolve("b", "home", 67).is_none());
	}

	#[test]
	fn bare_file_only_stands_in_for_100() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("a")).unwrap();
		touch_png(&dir.path().join("a/menu.png"));

		let store = AssetStore::new(dir.path());
		assert_eq!(store.resolve("a", "menu", 100).unwrap(), dir.path().join("a/menu.png"));
		for s in SCALES.into_iter().filter(|&s| s != 100) {
			assert!(store.resolve("a", "menu", s).is_none());
		}

		// A suffixed 100% file wins over the bare one.
		touch_png(&dir.path().join("a/menu_100.png"));
		assert_eq!(store.resolve("a", "menu", 100).unwrap(), dir.path().join("a/menu_100.png"));
	}

	#[test]
	fn undecodable_template_is_absent() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("a")).unwrap();
		std::fs::write(dir.path().join("a/broken_100.png"), b"not a png").unwrap();

		let store = AssetStore::new(dir.path());
		assert!(store.resolve("a", "broken", 100).is_some());
		assert!(store.template("a", "broken", 100, ColorMode::Grayscale).is_none());
	}

	#[test]
	fn template_follows_requested_mode() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("a")).unwrap();
		touch_png(&dir.path().join("a/x_100.png"));
		let store = AssetStore::new(dir.path());

		let gray = store.template("a", "x", 100, ColorMode::Grayscale).unwrap();
		assert_eq!(gray.mode(), ColorMode::Grayscale);
		assert_eq!(gray.dimensions(), (4, 3));
		assert_eq!(gray.name, "x_100.png");

		let color = store.template("a", "x", 100, ColorMode::Color).unwrap();
		assert!(matches!(color.pixels, Pixels::Color(_)));
	}
}
