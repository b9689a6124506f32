//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory. Missing fields
//! take their defaults, so older files keep loading as options are added.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ie::Region;
use ie::screen::window::WindowLayout;
use serde::{Deserialize, Serialize};

/// On-disk configuration for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template asset root. Searched for automatically when unset.
    pub assets_dir: Option<PathBuf>,

    /// Pause between iterations of the defense loop (seconds).
    pub loop_interval_secs: f32,

    /// Threshold for landmark and navigation matches.
    pub confidence: f32,

    pub upgrade: Upgrade,
    pub next_wave: NextWave,
    pub breach: Breach,
    pub restart: Restart,
    pub window: WindowLayout,
    pub page: PageRetry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: None,
            loop_interval_secs: 1.5,
            confidence: ie::DEFAULT_CONFIDENCE,
            upgrade: Upgrade::default(),
            next_wave: NextWave::default(),
            breach: Breach::default(),
            restart: Restart::default(),
            window: WindowLayout::default(),
            page: PageRetry::default(),
        }
    }
}

/// Upgrade clicks: a template first, then fixed positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Upgrade {
    pub positions: Vec<[i32; 2]>,
    pub template_path: Option<PathBuf>,
    pub region: Option<Region>,
    pub threshold: f32,
    pub max_clicks_per_loop: u32,
}

impl Default for Upgrade {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            template_path: None,
            region: None,
            threshold: 0.85,
            max_clicks_per_loop: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextWave {
    pub position: Option<[i32; 2]>,
    pub template_path: Option<PathBuf>,
    pub region: Option<Region>,
    pub threshold: f32,
    pub cooldown_secs: f32,
}

impl Default for NextWave {
    fn default() -> Self {
        Self {
            position: None,
            template_path: None,
            region: None,
            threshold: 0.85,
            cooldown_secs: 3.0,
        }
    }
}

/// Game-over detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breach {
    pub template_path: Option<PathBuf>,
    pub region: Option<Region>,
    pub threshold: f32,
    pub check_interval_secs: f32,
}

impl Default for Breach {
    fn default() -> Self {
        Self {
            template_path: None,
            region: None,
            threshold: 0.88,
            check_interval_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restart {
    pub close_hotkey: Vec<String>,
    /// Shell command that starts the game. Empty to skip.
    pub start_command: String,
    pub post_wait_secs: f32,
    /// Hotkey sequences sent after the game is back, one per entry.
    pub menu_hotkeys: Vec<Vec<String>>,
}

impl Default for Restart {
    fn default() -> Self {
        Self {
            close_hotkey: vec!["alt".to_string(), "f4".to_string()],
            start_command: String::new(),
            post_wait_secs: 5.0,
            menu_hotkeys: Vec::new(),
        }
    }
}

/// Defaults for the `page` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRetry {
    pub max_retries: u32,
    pub retry_interval_secs: f32,
}

impl Default for PageRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_interval_secs: 1.0,
        }
    }
}

impl Config {
    /// Directory holding the config file and captured templates.
    pub fn dir() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("tdsheep"))
    }

    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::dir()?.join("config.json"))
    }

    /// Where `capture-template` writes its PNGs.
    pub fn templates_dir() -> Result<PathBuf> {
        Ok(Self::dir()?.join("templates"))
    }

    /// Load configuration, writing the defaults out on first start.
    pub fn init() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            return Self::load_from(&path);
        }
        let cfg = Self::default();
        cfg.save_to(&path)?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(cfg)
    }

    /// Load configuration from disk, falling back to defaults on any failure.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Resolve a configured path; relative ones are taken from the config directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match Self::dir() {
            Ok(dir) => dir.join(path),
            Err(_) => path.to_path_buf(),
        }
    }

    /// Check that the defense loop has what it needs.
    pub fn preflight(&self) -> Preflight {
        self.preflight_with(|p| self.resolve(p).is_file())
    }

    fn preflight_with(&self, exists: impl Fn(&Path) -> bool) -> Preflight {
        let mut report = Preflight { ok: true, messages: Vec::new() };
        let usable = |p: &Option<PathBuf>| p.as_deref().is_some_and(&exists);

        if self.next_wave.position.is_none() && !usable(&self.next_wave.template_path) {
            report.fail("next_wave needs a position or a template_path");
        }
        if self.upgrade.positions.is_empty() && !usable(&self.upgrade.template_path) {
            report.messages.push("upgrade has neither positions nor a template_path; no upgrades will be clicked".to_string());
        }
        for (section, path) in [
            ("next_wave", &self.next_wave.template_path),
            ("upgrade", &self.upgrade.template_path),
            ("breach", &self.breach.template_path),
        ] {
            if let Some(p) = path
                && !exists(p.as_path())
            {
                report.fail(format!("{section}.template_path does not exist: {}", p.display()));
            }
        }
        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub ok: bool,
    pub messages: Vec<String>,
}

impl Preflight {
    fn fail(&mut self, msg: impl Into<String>) {
        self.ok = false;
        self.messages.push(msg.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg: Config = serde_json::from_str(
            r#"{"loop_interval_secs": 0.5, "next_wave": {"position": [10, 20]}, "upgrade": {"region": {"left": 1, "top": 2, "width": 3, "height": 4}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.loop_interval_secs, 0.5);
        assert_eq!(cfg.next_wave.position, Some([10, 20]));
        assert_eq!(cfg.next_wave.cooldown_secs, 3.0);
        assert_eq!(cfg.upgrade.region, Some(Region::new(1, 2, 3, 4)));
        assert_eq!(cfg.upgrade.max_clicks_per_loop, 3);
        assert_eq!(cfg.restart.close_hotkey, vec!["alt", "f4"]);
        assert_eq!(cfg.window.anchor, "a_2");
        assert_eq!(cfg.window.base_size, (1066, 912));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/config.json");
        let mut cfg = Config::default();
        cfg.upgrade.positions = vec![[1, 2], [3, 4]];
        cfg.restart.menu_hotkeys = vec![vec!["enter".to_string()]];
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);

        std::fs::write(&path, "{ nope").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn defaults_fail_preflight_on_next_wave_only() {
        let report = Config::default().preflight_with(|_| false);
        assert!(!report.ok);
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].starts_with("next_wave"));
    }

    #[test]
    fn a_position_is_enough() {
        let mut cfg = Config::default();
        cfg.next_wave.position = Some([5, 5]);
        cfg.upgrade.positions = vec![[1, 1]];
        let report = cfg.preflight_with(|_| false);
        assert!(report.ok);
        assert!(report.messages.is_empty());
    }

    #[test]
    fn configured_templates_must_exist() {
        let mut cfg = Config::default();
        cfg.next_wave.template_path = Some("templates/next_wave.png".into());
        cfg.breach.template_path = Some("templates/game_over.png".into());

        let report = cfg.preflight_with(|p| p.ends_with("next_wave.png"));
        assert!(!report.ok);
        assert!(report.messages.iter().any(|m| m.starts_with("breach.template_path")));

        let report = cfg.preflight_with(|_| true);
        assert!(report.ok);
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::default();
        assert_eq!(cfg.resolve(dir.path()), dir.path());
    }
}
