use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Resolve the template asset root in a way that works both:
/// - when running from the repo (`cargo run`), and
/// - when running a packaged binary (assets next to the executable).
///
/// You can override discovery by setting `TDSHEEP_ASSETS_DIR`, or with
/// `assets_dir` in the config.
pub fn resolve_assets_root(configured: Option<&Path>) -> Result<PathBuf> {
	let mut candidates: Vec<PathBuf> = Vec::new();
	if let Some(dir) = std::env::var_os("TDSHEEP_ASSETS_DIR") {
		candidates.push(PathBuf::from(dir));
	}
	if let Some(dir) = configured {
		candidates.push(dir.to_path_buf());
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.join("assets"));
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd.join("assets"));
	}
	// Compile-time path to the `tdsheep/` crate. Useful during local dev if the app is launched with a different CWD.
	#[cfg(debug_assertions)]
	candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("assets"));

	first_existing(candidates)
}

fn first_existing(candidates: Vec<PathBuf>) -> Result<PathBuf> {
	let mut tried = Vec::new();
	for dir in candidates {
		if dir.is_dir() {
			tracing::debug!(dir = %dir.display(), "asset root");
			return Ok(dir);
		}
		tried.push(dir);
	}

	bail!(
		"Template assets not found. Expected a folder with one sub-folder per group (a/, page_home/, auto_arena/, ...).\n\nSearched in:\n{}\n\nFix: copy the 'assets/' folder next to the executable (or set TDSHEEP_ASSETS_DIR to it).",
		tried
			.into_iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)
}
