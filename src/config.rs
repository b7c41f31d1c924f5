// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest first: built-in defaults, the TOML config file,
//! `TRVOYAGE_*` environment variables, then command-line flags.

use crate::modes::ViewMode;
use crate::ssot::DEFAULT_SSOT_CANDIDATES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TRVOYAGE";

/// Keys accepted by `trvoyage config`
pub const KEYS: [&str; 8] = [
    "data_dir",
    "ssot_candidates",
    "go_no_go_path",
    "weather_path",
    "tide_path",
    "default_actor",
    "default_mode",
    "log_level",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for the history and evidence logs
    pub data_dir: PathBuf,
    /// Schedule document locations, tried in order
    pub ssot_candidates: Vec<PathBuf>,
    /// Go/No-Go document
    pub go_no_go_path: PathBuf,
    /// Weather document
    pub weather_path: PathBuf,
    /// Tide windows document
    pub tide_path: PathBuf,
    /// Actor recorded on events and evidence
    pub default_actor: String,
    /// View mode when `--mode` is not given
    pub default_mode: ViewMode,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Default data directory
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "hyperpolymath", "trvoyage")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".trvoyage")
        })
}

/// Default config file location
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "hyperpolymath", "trvoyage")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ssot_candidates: DEFAULT_SSOT_CANDIDATES.iter().map(PathBuf::from).collect(),
            go_no_go_path: PathBuf::from("data/go_no_go.json"),
            weather_path: PathBuf::from("data/weather.json"),
            tide_path: PathBuf::from("data/tide_windows.json"),
            default_actor: std::env::var("USER").unwrap_or_else(|_| "operator".to_string()),
            default_mode: ViewMode::Live,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `file` (if it exists), then the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default()).context("Failed to build default configuration")?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = file {
            tracing::debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ssot_candidates"),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, ssot: Option<PathBuf>, mode: Option<ViewMode>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(path) = ssot {
            self.ssot_candidates = vec![path];
        }
        if let Some(mode) = mode {
            self.default_mode = mode;
        }
        self
    }

    /// Current value of a key, as text
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "data_dir" => self.data_dir.display().to_string(),
            "ssot_candidates" => self
                .ssot_candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(","),
            "go_no_go_path" => self.go_no_go_path.display().to_string(),
            "weather_path" => self.weather_path.display().to_string(),
            "tide_path" => self.tide_path.display().to_string(),
            "default_actor" => self.default_actor.clone(),
            "default_mode" => self.default_mode.to_string(),
            "log_level" => self.log_level.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// Write one key to the TOML config file, keeping the other keys
pub fn set_value(file: &Path, key: &str, value: &str) -> Result<()> {
    if !KEYS.contains(&key) {
        anyhow::bail!("Unknown configuration key: {} (expected one of: {})", key, KEYS.join(", "));
    }
    if key == "default_mode" {
        value
            .parse::<ViewMode>()
            .with_context(|| format!("Invalid value for {key}"))?;
    }

    let mut table: toml::Table = if file.exists() {
        let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", file.display()))?
    } else {
        toml::Table::new()
    };

    let entry = if key == "ssot_candidates" {
        toml::Value::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        )
    } else {
        toml::Value::String(value.to_string())
    };
    table.insert(key.to_string(), entry);

    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(&table).context("Failed to serialize configuration")?;
    fs::write(file, content).with_context(|| format!("Failed to write {}", file.display()))?;
    tracing::info!("Set {} in {}", key, file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_list_candidates_in_order() {
        let config = AppConfig::default();
        assert_eq!(
            config.ssot_candidates,
            vec![
                PathBuf::from("data/option_c.json"),
                PathBuf::from("option_c.json"),
                PathBuf::from("public/data/option_c.json"),
            ]
        );
        assert_eq!(config.default_mode, ViewMode::Live);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        set_value(&file, "default_actor", "marine-warranty").unwrap();
        set_value(&file, "ssot_candidates", "a.json, b.json").unwrap();
        set_value(&file, "default_mode", "approval").unwrap();

        let config = AppConfig::load(Some(&file)).unwrap();

        assert_eq!(config.default_actor, "marine-warranty");
        assert_eq!(config.ssot_candidates, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert_eq!(config.default_mode, ViewMode::Approval);
        assert_eq!(config.get("ssot_candidates").as_deref(), Some("a.json,b.json"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_mode() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        assert!(set_value(&file, "colour", "red").is_err());
        assert!(set_value(&file, "default_mode", "edit").is_err());
        assert!(!file.exists());
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/tmp/trv")),
            Some(PathBuf::from("fixture.json")),
            Some(ViewMode::History),
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/trv"));
        assert_eq!(config.ssot_candidates, vec![PathBuf::from("fixture.json")]);
        assert_eq!(config.default_mode, ViewMode::History);
        assert!(config.get("nope").is_none());
    }
}
