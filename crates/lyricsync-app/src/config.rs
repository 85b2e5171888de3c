//! On-disk configuration.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use lyricsync_core::LyricsSource;
use lyricsync_timing::HighlightMarker;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Application configuration, stored as JSON.
///
/// Unknown fields are ignored and missing fields take their defaults, so
/// older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lyrics cache directory. `None` uses the platform cache directory.
    #[serde(alias = "cache_folder", skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Reject lyrics that are mostly CJK.
    #[serde(alias = "filter_cjk_lyrics")]
    pub filter_cjk: bool,
    /// Added to every reported position; may be negative.
    pub offset_ms: i64,
    /// Sources whose lyrics are resolved but never displayed.
    #[serde(alias = "DisableLyricsFor")]
    pub disabled_sources: Vec<String>,
    /// LRCLIB SQLite dump used as the offline dataset.
    #[serde(alias = "lrclib_database_path", skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
    /// Never contact the remote lyrics services.
    pub offline_mode: bool,
    /// Start in word-sync display mode.
    pub word_sync: bool,
    pub tick_interval_ms: u64,
    /// Longest gap between two relayed updates.
    pub heartbeat_ms: u64,
    /// Line mode blanks a line shown unchanged for this long. 0 disables.
    pub line_hold_ms: u64,
    pub request_timeout_secs: u64,
    pub highlight: HighlightMarker,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            filter_cjk: true,
            offset_ms: 0,
            disabled_sources: Vec::new(),
            dataset_path: None,
            offline_mode: false,
            word_sync: false,
            tick_interval_ms: 200,
            heartbeat_ms: 4000,
            line_hold_ms: 5000,
            request_timeout_secs: 10,
            highlight: HighlightMarker::default(),
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "lyricsync", "lyricsync")
            .context("Failed to determine config directory")?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load `path`, writing a default config there first if it is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!("Wrote default config to {}", path.display()),
                Err(e) => warn!("Failed to write default config: {e:#}"),
            }
            return Ok(config);
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be positive");
        anyhow::ensure!(self.heartbeat_ms > 0, "heartbeat_ms must be positive");
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be positive"
        );
        self.disabled_sources()?;
        Ok(())
    }

    /// Parsed `disabled_sources`.
    pub fn disabled_sources(&self) -> Result<HashSet<LyricsSource>> {
        self.disabled_sources
            .iter()
            .map(|name| name.parse::<LyricsSource>().map_err(anyhow::Error::from))
            .collect()
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub const fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub const fn line_hold(&self) -> Option<Duration> {
        if self.line_hold_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.line_hold_ms))
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_or_create(&path).unwrap(), config);
    }

    #[test]
    fn test_legacy_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{
                "offset_ms": -250,
                "cache_folder": "/tmp/lyrics",
                "filter_cjk_lyrics": false,
                "offline_mode": true,
                "lrclib_database_path": "/data/db.sqlite3",
                "DisableLyricsFor": ["remote_b", "cache"]
            }"#,
        )
        .unwrap();

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config.offset_ms, -250);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/lyrics")));
        assert!(!config.filter_cjk);
        assert!(config.offline_mode);
        assert_eq!(config.dataset_path, Some(PathBuf::from("/data/db.sqlite3")));
        assert_eq!(config.tick_interval_ms, 200);

        let disabled = config.disabled_sources().unwrap();
        assert!(disabled.contains(&LyricsSource::Netease));
        assert!(disabled.contains(&LyricsSource::Cache));
        assert_eq!(disabled.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        fs::write(&path, r#"{"disabled_sources": ["spotify"]}"#).unwrap();
        assert!(Config::load_or_create(&path).is_err());

        fs::write(&path, r#"{"tick_interval_ms": 0}"#).unwrap();
        assert!(Config::load_or_create(&path).is_err());

        fs::write(&path, "{").unwrap();
        assert!(Config::load_or_create(&path).is_err());
    }

    #[test]
    fn test_line_hold_zero_disables() {
        let config = Config {
            line_hold_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.line_hold(), None);
        assert_eq!(
            Config::default().line_hold(),
            Some(Duration::from_secs(5))
        );
    }
}
