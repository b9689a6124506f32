//! Interactive setup: record click points and capture template images.
//!
//! The operator hovers the mouse and confirms with Enter; the cursor position
//! at that moment is what gets recorded.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use ie::{Input, Region, ScreenCapture};

use crate::config::Config;

/// Record the next-wave button and any number of upgrade points into `config`.
pub fn calibrate(config: &mut Config, input: &mut dyn Input, mut ask: impl FnMut(&str) -> Result<String>) -> Result<()> {
	println!("Calibrating click positions.");
	let (x, y) = pick_point("Next wave button", input, &mut ask)?;
	config.next_wave.position = Some([x, y]);

	println!("Upgrade points: press Enter to record one, q to finish.");
	let mut positions = Vec::new();
	loop {
		let line = ask("  Enter = record, q = done: ")?;
		if line.trim().eq_ignore_ascii_case("q") {
			break;
		}
		let (x, y) = input.cursor()?;
		println!("  recorded ({x}, {y})");
		positions.push([x, y]);
	}
	tracing::info!(upgrades = positions.len(), "calibration done");
	config.upgrade.positions = positions;
	Ok(())
}

/// Capture a screen region into `<dir>/<name>.png`.
pub fn capture_template(
	name: &str,
	dir: &Path,
	screen: &mut dyn ScreenCapture,
	input: &mut dyn Input,
	mut ask: impl FnMut(&str) -> Result<String>,
) -> Result<PathBuf> {
	let name = name.trim();
	if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
		bail!("invalid template name {name:?}");
	}

	let region = pick_region(input, &mut ask)?;
	let frame = screen.capture(Some(region))?;
	let path = dir.join(format!("{name}.png"));
	frame.save_png(&path)?;
	tracing::info!(path = %path.display(), ?region, "template saved");
	Ok(path)
}

fn pick_point(what: &str, input: &mut dyn Input, ask: &mut impl FnMut(&str) -> Result<String>) -> Result<(i32, i32)> {
	ask(&format!("{what}: move the mouse there and press Enter..."))?;
	let (x, y) = input.cursor()?;
	println!("  recorded ({x}, {y})");
	Ok((x, y))
}

fn pick_region(input: &mut dyn Input, ask: &mut impl FnMut(&str) -> Result<String>) -> Result<Region> {
	let a = pick_point("Top-left corner", input, ask)?;
	let b = pick_point("Bottom-right corner", input, ask)?;
	let region = Region::from_corners(a, b);
	if region.width == 0 || region.height == 0 {
		bail!("empty region {region:?}");
	}
	Ok(region)
}
