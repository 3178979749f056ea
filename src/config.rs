// src/config.rs
//! Application configuration: feed list, language preference, translation
//! provider, caps and delivery settings. JSON is the primary format
//! (`config.json`); TOML is accepted by extension.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::FeedSource;

const ENV_PATH: &str = "VEILLE_CONFIG_PATH";
const DEFAULT_PATH: &str = "config.json";

fn default_language() -> String {
    "French".to_string()
}
fn default_provider() -> String {
    "claude".to_string()
}
fn default_max_articles() -> usize {
    5
}
fn default_fetch_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// "claude" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub from: String,
    pub recipient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rss_feeds: Vec<FeedSource>,
    /// Target language display name, e.g. "French".
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Per-category article cap, clamped to >= 1 at load.
    #[serde(default = "default_max_articles")]
    pub max_articles_per_feed: usize,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    /// ISO-8601 timestamp of the last successful run, written back by the
    /// orchestrator.
    #[serde(default)]
    pub last_execution: Option<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig = match format_hint(path) {
            Format::Toml => toml::from_str(&content).context("parsing TOML config")?,
            Format::Json => serde_json::from_str(&content).context("parsing JSON config")?,
        };

        cfg.translation.provider = cfg.translation.provider.to_lowercase();
        if cfg.max_articles_per_feed == 0 {
            cfg.max_articles_per_feed = 1;
        }
        if cfg.rss_feeds.is_empty() {
            bail!("config has no rss_feeds");
        }
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match format_hint(path) {
            Format::Toml => toml::to_string_pretty(self).context("serializing TOML config")?,
            Format::Json => {
                serde_json::to_string_pretty(self).context("serializing JSON config")?
            }
        };
        fs::write(path, content)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Parsed last-run timestamp. Fails open: a malformed value is logged
    /// and treated as absent so a bad write can never wedge the filter.
    pub fn last_execution_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_execution.as_deref()?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(value = raw, error = %e, "unparseable last_execution, ignoring");
                None
            }
        }
    }

    pub fn touch_last_execution(&mut self, now: DateTime<Utc>) {
        self.last_execution = Some(now.to_rfc3339());
    }
}

enum Format {
    Json,
    Toml,
}

fn format_hint(path: &Path) -> Format {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
        _ => Format::Json,
    }
}

/// Resolve the config path: CLI flag, then $VEILLE_CONFIG_PATH, then
/// `config.json` in the working directory.
pub fn resolve_path(cli: Option<PathBuf>) -> PathBuf {
    if let Some(p) = cli {
        return p;
    }
    if let Ok(p) = std::env::var(ENV_PATH) {
        return PathBuf::from(p);
    }
    PathBuf::from(DEFAULT_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "rss_feeds": [
                {"name": "TechCrunch", "url": "https://techcrunch.com/feed/", "category": "Tech"}
            ],
            "language": "French",
            "translation": {"provider": "Claude"},
            "max_articles_per_feed": 0,
            "last_execution": "2025-08-01T06:00:00+00:00"
        }"#
    }

    #[test]
    fn json_round_trip_and_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, minimal_json()).unwrap();

        let mut cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.translation.provider, "claude"); // lowercased
        assert_eq!(cfg.max_articles_per_feed, 1); // clamped
        assert!(cfg.last_execution_utc().is_some());

        let now = Utc::now();
        cfg.touch_last_execution(now);
        cfg.save(&path).unwrap();
        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(
            reloaded.last_execution_utc().map(|d| d.timestamp()),
            Some(now.timestamp())
        );
    }

    #[test]
    fn toml_is_accepted_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
language = "English"

[[rss_feeds]]
name = "Ars Technica"
url = "https://feeds.arstechnica.com/arstechnica/index"
category = "Tech"
"#,
        )
        .unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.language, "English");
        assert_eq!(cfg.rss_feeds.len(), 1);
        assert_eq!(cfg.max_articles_per_feed, default_max_articles());
    }

    #[test]
    fn empty_feed_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"rss_feeds": []}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn malformed_last_execution_fails_open() {
        let cfg = AppConfig {
            rss_feeds: vec![],
            language: default_language(),
            translation: TranslationConfig::default(),
            max_articles_per_feed: 5,
            fetch_timeout_secs: 10,
            email: None,
            last_execution: Some("yesterday-ish".into()),
        };
        assert!(cfg.last_execution_utc().is_none());
    }

    #[serial_test::serial]
    #[test]
    fn path_resolution_prefers_cli_then_env() {
        std::env::remove_var(ENV_PATH);
        assert_eq!(resolve_path(None), PathBuf::from(DEFAULT_PATH));

        std::env::set_var(ENV_PATH, "/tmp/veille.json");
        assert_eq!(resolve_path(None), PathBuf::from("/tmp/veille.json"));
        assert_eq!(
            resolve_path(Some(PathBuf::from("cli.json"))),
            PathBuf::from("cli.json")
        );
        std::env::remove_var(ENV_PATH);
    }
}
