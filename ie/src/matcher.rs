//! Template matching with an adaptive display-scale heuristic.
//!
//! Scores are zero-mean normalized cross-correlation clamped to `[0, 1]`.
//! The raw cross-correlation comes from `imageproc`; the mean and energy
//! terms are read from summed-area tables of the search frame, which also
//! lets the full-color mode reuse the same single-channel correlation.

use image::{GrayImage, Luma, RgbImage};
use imageproc::template_matching::{MatchTemplateMethod, match_template_parallel};

use crate::scale::ordered_scales;
use crate::store::{AssetStore, Pixels, Template};
use crate::{Frame, Region, ScreenCapture, StateFile};

/// Threshold used when the caller has no opinion.
pub const DEFAULT_CONFIDENCE: f32 = 0.7;

/// Slack for float error so an exact copy still clears a 1.0 threshold.
const SCORE_EPSILON: f32 = 1e-4;

/// Whether to correlate luma only, or all three channels.
///
/// Grayscale is faster and tolerates lighting changes. Color is required when
/// two states differ only by tint (a button rendered grey when disabled).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
	#[default]
	Grayscale,
	Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
	pub left: i32,
	pub top: i32,
	pub width: u32,
	pub height: u32,
	pub center: (i32, i32),
	pub score: f32,
}

/// Find `template` in `frame`.
///
/// Returns the best-aligned position if its score reaches `confidence`. A
/// template larger than the frame on either axis never matches.
pub fn locate(frame: &Frame, template: &Template, confidence: f32) -> Option<MatchResult> {
	let (tw, th) = template.dimensions();
	if tw == 0 || th == 0 || tw > frame.width() || th > frame.height() {
		return None;
	}

	let (x, y, score) = match &template.pixels {
		Pixels::Gray(tpl) => best_position(&[frame.to_luma8()], std::slice::from_ref(tpl))?,
		Pixels::Color(tpl) => best_position(&split_channels(frame.rgb()), &split_channels(tpl))?,
	};

	tracing::trace!(template = %template.name, score, x, y, "best alignment");
	if score + SCORE_EPSILON < confidence {
		return None;
	}

	let (ox, oy) = frame.origin();
	let left = ox + x as i32;
	let top = oy + y as i32;
	Some(MatchResult {
		left,
		top,
		width: tw,
		height: th,
		center: (left + (tw / 2) as i32, top + (th / 2) as i32),
		score,
	})
}

/// Best (x, y, score) over all alignments, or `None` if every window was degenerate.
fn best_position(image: &[GrayImage], template: &[GrayImage]) -> Option<(u32, u32, f32)> {
	let (iw, ih) = image[0].dimensions();
	let (tw, th) = template[0].dimensions();
	let n = (tw as f64) * (th as f64);

	let mut tpl_sum = Vec::with_capacity(template.len());
	let mut tpl_var = 0.0f64;
	for t in template {
		let (s, q) = t.pixels().fold((0.0f64, 0.0f64), |(s, q), p| {
			let v = p.0[0] as f64;
			(s + v, q + v * v)
		});
		tpl_sum.push(s);
		tpl_var += q - s * s / n;
	}
	// A flat template correlates with nothing.
	if tpl_var <= f64::EPSILON {
		return None;
	}

	let cross = image
		.iter()
		.zip(template)
		.map(|(i, t)| match_template_parallel(i, t, MatchTemplateMethod::CrossCorrelation))
		.collect::<Vec<_>>();
	let tables = image.iter().map(SummedArea::new).collect::<Vec<_>>();

	let mut best: Option<(u32, u32, f32)> = None;
	for y in 0..=(ih - th) {
		for x in 0..=(iw - tw) {
			let mut num = 0.0f64;
			let mut win_var = 0.0f64;
			for c in 0..image.len() {
				let (s, q) = tables[c].window(x, y, tw, th);
				let cc = cross[c].get_pixel(x, y).0[0] as f64;
				num += cc - tpl_sum[c] * s / n;
				win_var += q - s * s / n;
			}
			if win_var <= f64::EPSILON {
				continue;
			}
			let score = (num / (tpl_var * win_var).sqrt()) as f32;
			if !score.is_finite() {
				continue;
			}
			let score = score.clamp(0.0, 1.0);
			if best.is_none_or(|(_, _, b)| score > b) {
				best = Some((x, y, score));
			}
		}
	}
	best
}

fn split_channels(rgb: &RgbImage) -> [GrayImage; 3] {
	std::array::from_fn(|c| GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| Luma([rgb.get_pixel(x, y).0[c]])))
}

/// Summed-area tables of pixel values and squared pixel values.
struct SummedArea {
	stride: usize,
	sum: Vec<f64>,
	sq: Vec<f64>,
}

impl SummedArea {
	fn new(img: &GrayImage) -> Self {
		let (w, h) = (img.width() as usize, img.height() as usize);
		let stride = w + 1;
		let mut sum = vec![0.0; stride * (h + 1)];
		let mut sq = vec![0.0; stride * (h + 1)];
		for y in 0..h {
			let mut row_s = 0.0;
			let mut row_q = 0.0;
			for x in 0..w {
				let v = img.get_pixel(x as u32, y as u32).0[0] as f64;
				row_s += v;
				row_q += v * v;
				let i = (y + 1) * stride + x + 1;
				sum[i] = sum[i - stride] + row_s;
				sq[i] = sq[i - stride] + row_q;
			}
		}
		Self { stride, sum, sq }
	}

	/// (sum, sum of squares) over the `w`×`h` window at (x, y).
	fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
		let (x0, y0) = (x as usize, y as usize);
		let (x1, y1) = (x0 + w as usize, y0 + h as usize);
		let at = |t: &[f64], x: usize, y: usize| t[y * self.stride + x];
		let area = |t: &[f64]| at(t, x1, y1) - at(t, x0, y1) - at(t, x1, y0) + at(t, x0, y0);
		(area(&self.sum), area(&self.sq))
	}
}

// ----------

/// How to look for one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
	pub confidence: f32,
	pub mode: ColorMode,
	/// Search area on screen; `None` searches the full screen.
	pub region: Option<Region>,
}

impl Default for Probe {
	fn default() -> Self {
		Self {
			confidence: DEFAULT_CONFIDENCE,
			mode: ColorMode::Grayscale,
			region: None,
		}
	}
}

impl Probe {
	pub fn with_confidence(confidence: f32) -> Self {
		Self { confidence, ..Self::default() }
	}

	pub fn color(mut self) -> Self {
		self.mode = ColorMode::Color;
		self
	}

	pub fn in_region(mut self, region: Region) -> Self {
		self.region = Some(region);
		self
	}
}

/// Outcome of an adaptive-scale lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Located {
	pub result: Option<MatchResult>,
	pub scale: Option<u32>,
	/// Scales whose variant existed and was correlated, in the order tried.
	pub tried: Vec<u32>,
}

impl Located {
	#[inline]
	pub fn hit(&self) -> Option<&MatchResult> {
		self.result.as_ref()
	}

	#[inline]
	pub fn is_hit(&self) -> bool {
		self.result.is_some()
	}
}

/// The match engine: asset lookup plus a screen to search in.
pub struct Matcher<C> {
	store: AssetStore,
	capture: C,
}

impl<C: ScreenCapture> Matcher<C> {
	pub fn new(store: AssetStore, capture: C) -> Self {
		Self { store, capture }
	}

	pub fn store(&self) -> &AssetStore {
		&self.store
	}

	pub fn capture_mut(&mut self) -> &mut C {
		&mut self.capture
	}

	/// Capture `region`, logging instead of failing.
	pub fn grab(&mut self, region: Option<Region>) -> Option<Frame> {
		match self.capture.capture(region) {
			Ok(frame) => Some(frame),
			Err(err) => {
				tracing::warn!(error = %err, ?region, "screen capture failed");
				None
			}
		}
	}

	/// Capture once, then look for `group/stem` at every supported scale,
	/// starting with the recommended one.
	///
	/// Never sleeps or retries; backoff is the caller's batch-level policy.
	pub fn locate_with_adaptive_scale(&mut self, state: &mut StateFile, group: &str, stem: &str, probe: &Probe) -> Located {
		let Some(frame) = self.grab(probe.region) else {
			return Located::default();
		};
		self.locate_in(&frame, state, group, stem, probe)
	}

	/// Same as [`Self::locate_with_adaptive_scale`] against an existing capture.
	///
	/// On success the winning scale becomes the recommended one immediately,
	/// so later lookups in the same run try it first.
	pub fn locate_in(&self, frame: &Frame, state: &mut StateFile, group: &str, stem: &str, probe: &Probe) -> Located {
		let cropped;
		let frame = match probe.region {
			Some(region) if region != frame.bounds() => match frame.crop(region) {
				Some(sub) => {
					cropped = sub;
					&cropped
				}
				None => return Located::default(),
			},
			_ => frame,
		};

		let mut located = Located::default();
		for scale in ordered_scales(state.recommended_scale()) {
			let Some(path) = self.store.resolve(group, stem, scale) else {
				continue;
			};
			let Some(template) = crate::store::load_template(&path, probe.mode) else {
				continue;
			};
			located.tried.push(scale);

			match locate(frame, &template, probe.confidence) {
				Some(m) => {
					tracing::info!(asset = %template.name, scale, score = m.score, "matched");
					state.record_hit(stem, scale);
					located.result = Some(m);
					located.scale = Some(scale);
					return located;
				}
				None => tracing::debug!(asset = %template.name, scale, "no match"),
			}
		}

		if located.tried.is_empty() {
			tracing::info!(group, stem, "no template variant on disk");
		} else {
			tracing::info!(group, stem, tried = ?located.tried, "no match at any scale");
		}
		located
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ScaleState;
	use crate::testing::{FixedScreen, textured};

	fn template_from(frame: &Frame, x: u32, y: u32, w: u32, h: u32, mode: ColorMode) -> Template {
		let rgb = image::imageops::crop_imm(frame.rgb(), x, y, w, h).to_image();
		Template::from_rgb("probe", rgb, mode)
	}

	#[test]
	fn exact_copy_scores_one_at_its_position() {
		let frame = Frame::new((100, 50), textured(80, 60, 1));
		let tpl = template_from(&frame, 23, 17, 16, 12, ColorMode::Grayscale);

		let m = locate(&frame, &tpl, 1.0).expect("identical sub-image must match at 1.0");
		assert!(m.score > 0.999, "score {}", m.score);
		assert_eq!((m.left, m.top), (123, 67));
		assert_eq!((m.width, m.height), (16, 12));
		assert_eq!(m.center, (131, 73));
	}

	#[test]
	fn threshold_above_best_score_is_absent() {
		let frame = Frame::new((0, 0), textured(60, 60, 1));
		let unrelated = Template::from_rgb("other", textured(12, 12, 9), ColorMode::Grayscale);

		let gray = crate::frame::to_luma8(&textured(12, 12, 9));
		let best = best_position(&[frame.to_luma8()], &[gray]).unwrap();
		assert!(best.2 < 0.9);

		assert!(locate(&frame, &unrelated, best.2 + 0.01).is_none());
		let found = locate(&frame, &unrelated, best.2).unwrap();
		assert_eq!(found.score, best.2);
	}

	#[test]
	fn oversized_template_never_matches() {
		let frame = Frame::new((0, 0), textured(30, 20, 1));
		let wide = Template::from_rgb("wide", textured(31, 5, 1), ColorMode::Grayscale);
		let tall = Template::from_rgb("tall", textured(5, 21, 1), ColorMode::Color);
		assert!(locate(&frame, &wide, 0.0).is_none());
		assert!(locate(&frame, &tall, 0.0).is_none());
	}

	#[test]
	fn color_mode_tells_tints_apart() {
		// Same luminance structure, different tint.
		let base = textured(20, 14, 4);
		let grey = RgbImage::from_fn(20, 14, |x, y| {
			let v = base.get_pixel(x, y).0[0];
			image::Rgb([v, v, v])
		});
		let orange = RgbImage::from_fn(20, 14, |x, y| {
			let v = base.get_pixel(x, y).0[0];
			image::Rgb([v, v / 2, 0])
		});

		let mut screen = RgbImage::from_pixel(90, 60, image::Rgb([30, 30, 30]));
		image::imageops::replace(&mut screen, &grey, 40, 25);
		let frame = Frame::new((0, 0), screen);

		let gray_tpl = Template::from_rgb("orange", orange.clone(), ColorMode::Grayscale);
		let color_tpl = Template::from_rgb("orange", orange, ColorMode::Color);

		let m = locate(&frame, &gray_tpl, 0.95).expect("luma pattern is identical");
		assert_eq!((m.left, m.top), (40, 25));
		assert!(locate(&frame, &color_tpl, 0.9).is_none());

		let grey_tpl = Template::from_rgb("grey", grey, ColorMode::Color);
		let m = locate(&frame, &grey_tpl, 0.99).unwrap();
		assert_eq!((m.left, m.top), (40, 25));
	}

	#[test]
	fn flat_template_has_no_match() {
		let frame = Frame::new((0, 0), textured(40, 40, 2));
		let flat = Template::from_rgb("flat", RgbImage::from_pixel(8, 8, image::Rgb([7, 7, 7])), ColorMode::Grayscale);
		assert!(locate(&frame, &flat, 0.0).is_none());
	}

	#[test]
	fn region_probe_reports_screen_coordinates() {
		let frame = Frame::new((0, 0), textured(120, 90, 3));
		let tpl = template_from(&frame, 70, 40, 10, 10, ColorMode::Grayscale);
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("g")).unwrap();
		match &tpl.pixels {
			Pixels::Gray(g) => g.save(dir.path().join("g/t_100.png")).unwrap(),
			Pixels::Color(_) => unreachable!(),
		}

		let matcher = Matcher::new(AssetStore::new(dir.path()), FixedScreen::new(frame.clone()));
		let mut state = StateFile::in_memory(ScaleState::default());

		let probe = Probe::default().in_region(Region::new(60, 30, 40, 40));
		let located = matcher.locate_in(&frame, &mut state, "g", "t", &probe);
		let m = located.hit().unwrap();
		assert_eq!((m.left, m.top), (70, 40));

		// Region that excludes the landmark.
		let probe = Probe::default().in_region(Region::new(0, 0, 50, 50));
		assert!(!matcher.locate_in(&frame, &mut state, "g", "t", &probe).is_hit());
	}
}
