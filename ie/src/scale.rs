//! Supported display-scale percentages.

/// Every scale a template variant may exist at, in canonical (ascending) order.
pub const SCALES: [u32; 8] = [50, 67, 75, 80, 90, 100, 110, 125];

/// Scale used when nothing better is known.
pub const DEFAULT_SCALE: u32 = 100;

/// Snap an arbitrary percentage onto the supported set.
///
/// Values already in the set pass through. Anything else goes to the nearest
/// member; ties resolve to the smaller one.
pub fn snap_scale(scale: i64) -> u32 {
	let mut best = SCALES[0];
	let mut best_dist = u64::MAX;
	for s in SCALES {
		let dist = (s as i64).abs_diff(scale);
		if dist < best_dist {
			best = s;
			best_dist = dist;
		}
	}
	best
}

#[inline]
pub fn is_supported(scale: u32) -> bool {
	SCALES.contains(&scale)
}

/// Priority order for a lookup: the preferred scale first, then the canonical
/// order with the preferred one removed.
pub fn ordered_scales(preferred: u32) -> Vec<u32> {
	let preferred = snap_scale(preferred as i64);
	let mut order = Vec::with_capacity(SCALES.len());
	order.push(preferred);
	order.extend(SCALES.iter().copied().filter(|&s| s != preferred));
	order
}

/// Multiply a length measured at 100% by `scale` percent.
#[inline]
pub fn scaled(base: i32, scale: u32) -> i32 {
	(base as f64 * scale as f64 / 100.0).round() as i32
}
