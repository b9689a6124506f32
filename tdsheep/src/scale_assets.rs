//! Pre-scaled template variants.
//!
//! Every base image `<stem>.png` gets one `<stem>_<s>.png` per supported
//! scale, so the match engine can look assets up by scale instead of
//! resizing at match time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use image::imageops::{self, FilterType};

use ie::{SCALES, is_supported};

/// Base images of the window chrome in group `a`.
pub const WINDOW_STEMS: [&str; 6] = ["a_1", "a_2", "a_3", "a_4", "a_5", "a_6"];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
	pub sources: usize,
	pub written: usize,
	pub missing: Vec<String>,
}

/// Size of a `width`x`height` image at `scale` percent, never below 1x1.
pub fn scaled_size((width, height): (u32, u32), scale: u32) -> (u32, u32) {
	let f = |d: u32| ((d as f64 * scale as f64 / 100.0).round() as u32).max(1);
	(f(width), f(height))
}

/// Write `<stem>_<s>.png` next to `base` for every supported scale. Alpha is kept.
pub fn generate_variants(base: &Path) -> Result<Vec<PathBuf>> {
	let img = image::open(base).with_context(|| format!("decode {:?}", base))?.to_rgba8();
	let stem = base
		.file_stem()
		.and_then(|s| s.to_str())
		.with_context(|| format!("bad file name {:?}", base))?;
	let dir = base.parent().unwrap_or(Path::new("."));

	let mut written = Vec::with_capacity(SCALES.len());
	for scale in SCALES {
		let (w, h) = scaled_size(img.dimensions(), scale);
		let out = imageops::resize(&img, w, h, FilterType::Lanczos3);
		let path = dir.join(format!("{stem}_{scale}.png"));
		out.save_with_format(&path, image::ImageFormat::Png)
			.with_context(|| format!("write {:?}", path))?;
		tracing::info!(file = %path.display(), w, h, "generated");
		written.push(path);
	}
	Ok(written)
}

/// Generate variants for a group directory.
///
/// With `all`, every unsuffixed PNG in `dir` is a base image; otherwise the
/// window stems `a_1..a_6`. Unreadable sources are skipped.
pub fn generate_group(dir: &Path, all: bool) -> Result<Summary> {
	if !dir.is_dir() {
		bail!("asset group directory {:?} does not exist", dir);
	}

	let mut summary = Summary::default();
	let bases = if all {
		base_images(dir)?
	} else {
		let mut bases = Vec::new();
		for stem in WINDOW_STEMS {
			let path = dir.join(format!("{stem}.png"));
			if path.is_file() {
				bases.push(path);
			} else {
				tracing::warn!(file = %path.display(), "source image missing");
				summary.missing.push(stem.to_string());
			}
		}
		bases
	};

	for base in bases {
		match generate_variants(&base) {
			Ok(written) => {
				summary.sources += 1;
				summary.written += written.len();
			}
			Err(err) => tracing::warn!(error = %format!("{err:#}"), "skipped"),
		}
	}
	tracing::info!(sources = summary.sources, written = summary.written, "scaled assets done");
	Ok(summary)
}

/// PNGs in `dir` that are not themselves scale variants, sorted by name.
fn base_images(dir: &Path) -> Result<Vec<PathBuf>> {
	let mut bases = Vec::new();
	for entry in std::fs::read_dir(dir).with_context(|| format!("read {:?}", dir))? {
		let path = entry?.path();
		let is_png = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("png"));
		let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
			continue;
		};
		if is_png && !is_variant(stem) {
			bases.push(path);
		}
	}
	bases.sort();
	Ok(bases)
}

fn is_variant(stem: &str) -> bool {
	stem.rsplit_once('_')
		.and_then(|(_, suffix)| suffix.parse::<u32>().ok())
		.is_some_and(is_supported)
}
