use anyhow::{Context, Result};
use ie::{Frame, Region, ScreenCapture};

/// Captures the primary monitor.
///
/// xcap hands back RGBA; frames are converted to RGB with the monitor's
/// top-left as origin, then cropped to the requested region.
pub struct XcapScreen {
	monitor: xcap::Monitor,
}

impl XcapScreen {
	pub fn primary() -> Result<Self> {
		let monitors = xcap::Monitor::all().context("list monitors")?;
		let index = monitors
			.iter()
			.position(|m| m.is_primary().unwrap_or(false))
			.unwrap_or(0);
		let monitor = monitors.into_iter().nth(index).context("no monitors found")?;
		tracing::debug!(name = ?monitor.name().ok(), "capturing monitor");
		Ok(Self { monitor })
	}

	fn origin(&self) -> (i32, i32) {
		(self.monitor.x().unwrap_or(0), self.monitor.y().unwrap_or(0))
	}
}

impl ScreenCapture for XcapScreen {
	fn capture(&mut self, region: Option<Region>) -> Result<Frame> {
		let img = self.monitor.capture_image().context("capture monitor")?;
		let frame = Frame::from_rgba(self.origin(), img.width(), img.as_raw())?;
		match region {
			None => Ok(frame),
			Some(region) => frame
				.crop(region)
				.with_context(|| format!("region {region:?} is outside the monitor")),
		}
	}

	fn screen_size(&mut self) -> Result<(u32, u32)> {
		Ok((self.monitor.width()?, self.monitor.height()?))
	}
}
