//! Persisted scale heuristic.
//!
//! Stored as JSON in a platform data directory:
//! `{"recommended_scale": 100, "fail_count": 0, "per_template": {"a_1": 100}}`.
//! Single process, single thread: there is no locking, so two processes must
//! not share one file. Deleting the file resets the heuristic.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scale::{DEFAULT_SCALE, snap_scale};

/// Longest wait ever advised between failed batches, in seconds.
pub const MAX_BACKOFF_SECS: f64 = 5.0;
const BASE_BACKOFF_SECS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleState {
	pub recommended_scale: u32,
	pub fail_count: u32,
	pub per_template: BTreeMap<String, u32>,
}

impl Default for ScaleState {
	fn default() -> Self {
		Self {
			recommended_scale: DEFAULT_SCALE,
			fail_count: 0,
			per_template: BTreeMap::new(),
		}
	}
}

impl ScaleState {
	/// Default location, overridable with `TDSHEEP_STATE`.
	pub fn default_path() -> Result<PathBuf> {
		if let Some(path) = std::env::var_os("TDSHEEP_STATE") {
			return Ok(PathBuf::from(path));
		}
		let base = dirs::data_dir().context("data_dir() unavailable")?;
		Ok(base.join("tdsheep").join("scale_state.json"))
	}

	/// Load from disk. Never fails: a missing file yields defaults, and a
	/// damaged one is repaired field by field.
	pub fn load(path: &Path) -> Self {
		if !path.exists() {
			return Self::default();
		}
		let json = match std::fs::read_to_string(path) {
			Ok(json) => json,
			Err(err) => {
				tracing::warn!(path = %path.display(), error = %err, "unreadable scale state; using defaults");
				return Self::default();
			}
		};
		match serde_json::from_str::<Value>(&json) {
			Ok(value) => Self::from_value(&value),
			Err(err) => {
				tracing::warn!(path = %path.display(), error = %err, "corrupt scale state; using defaults");
				Self::default()
			}
		}
	}

	/// Lenient decode of whatever JSON is found on disk.
	pub fn from_value(value: &Value) -> Self {
		let mut state = Self::default();

		match value.get("recommended_scale").and_then(as_int) {
			Some(v) => state.recommended_scale = snap_scale(v),
			None if value.get("recommended_scale").is_some() => {
				tracing::warn!("scale state: bad recommended_scale; using {DEFAULT_SCALE}");
			}
			None => {}
		}

		match value.get("fail_count").and_then(as_int) {
			Some(v) => state.fail_count = v.clamp(0, u32::MAX as i64) as u32,
			None if value.get("fail_count").is_some() => {
				tracing::warn!("scale state: bad fail_count; using 0");
			}
			None => {}
		}

		if let Some(map) = value.get("per_template").and_then(Value::as_object) {
			for (stem, v) in map {
				if let Some(v) = as_int(v) {
					state.per_template.insert(stem.clone(), snap_scale(v));
				}
			}
		}

		state
	}

	/// Write atomically (temp file, then rename).
	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent()
			&& !parent.as_os_str().is_empty()
		{
			std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
		}

		let tmp = path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("write {:?}", tmp))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer_pretty(&mut writer, self).context("serialize scale state")?;
		writer.flush().context("flush scale state")?;
		drop(writer);

		// Windows refuses to rename over an existing file.
		if std::fs::rename(&tmp, path).is_err() {
			let _ = std::fs::remove_file(path);
			std::fs::rename(&tmp, path).with_context(|| format!("persist {:?}", path))?;
		}
		Ok(())
	}

	/// A single asset matched at `scale`. Does not touch `fail_count`.
	pub fn record_hit(&mut self, stem: &str, scale: u32) {
		let scale = snap_scale(scale as i64);
		self.recommended_scale = scale;
		self.per_template.insert(stem.to_string(), scale);
	}

	/// Close a detection batch. Returns the advised wait after a failure.
	pub fn record_batch(&mut self, success: bool) -> Option<Duration> {
		if success {
			self.fail_count = 0;
			None
		} else {
			self.fail_count = self.fail_count.saturating_add(1);
			Some(backoff_for(self.fail_count))
		}
	}
}

/// Advised wait after `fail_count` consecutive failed batches:
/// `min(5, 0.5 * 2^(n-1))` seconds, zero when nothing failed.
pub fn backoff_for(fail_count: u32) -> Duration {
	if fail_count == 0 {
		return Duration::ZERO;
	}
	let exp = (fail_count - 1).min(16) as i32;
	Duration::from_secs_f64((BASE_BACKOFF_SECS * 2f64.powi(exp)).min(MAX_BACKOFF_SECS))
}

fn as_int(v: &Value) -> Option<i64> {
	match v {
		Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
		Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
		_ => None,
	}
}

/// Load/mutate/save handle for the scale state.
///
/// Callers own one of these and pass it down explicitly; every mutation is
/// written through immediately so a crash never loses a learned scale.
#[derive(Debug)]
pub struct StateFile {
	path: Option<PathBuf>,
	state: ScaleState,
}

impl StateFile {
	pub fn open(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let state = ScaleState::load(&path);
		tracing::debug!(path = %path.display(), ?state, "scale state loaded");
		Self { path: Some(path), state }
	}

	/// State that is never written anywhere.
	pub fn in_memory(state: ScaleState) -> Self {
		Self { path: None, state }
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	pub fn state(&self) -> &ScaleState {
		&self.state
	}

	pub fn recommended_scale(&self) -> u32 {
		self.state.recommended_scale
	}

	pub fn record_hit(&mut self, stem: &str, scale: u32) {
		self.state.record_hit(stem, scale);
		self.commit();
	}

	pub fn record_batch(&mut self, success: bool) -> Option<Duration> {
		let wait = self.state.record_batch(success);
		self.commit();
		wait
	}

	pub fn reset(&mut self) {
		self.state = ScaleState::default();
		self.commit();
	}

	pub fn save(&self) -> Result<()> {
		match &self.path {
			Some(path) => self.state.save(path),
			None => Ok(()),
		}
	}

	fn commit(&self) {
		if let Err(err) = self.save() {
			tracing::warn!(error = %err, "failed to save scale state");
		}
	}
}
