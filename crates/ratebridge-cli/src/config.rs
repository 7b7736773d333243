//! Settings management for the CLI
//!
//! Settings are loaded from, in order of precedence:
//! - Command-line arguments
//! - Environment variables (`RATEBRIDGE_BUNDLE`, `RATEBRIDGE_TIMEOUT_SECS`)
//! - A settings file (YAML, JSON or TOML)
//! - Default values

use crate::error::{Error, Result};
use ratebridge_core::{CacheConfig, InvokerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration bundle used when `--bundle` is not given
    pub bundle: Option<PathBuf>,

    /// Outbound call settings
    pub http: InvokerConfig,

    /// Configuration cache settings
    pub cache: CacheConfig,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// Logging section of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,
}

impl Config {
    /// Load settings from a file, choosing the parser by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        Ok(config)
    }

    /// Load settings from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                // Runs before logging is initialized
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to load settings from {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file or default locations, then apply
    /// environment overrides
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Get default settings file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("ratebridge.yaml"),
            PathBuf::from("ratebridge.yml"),
            PathBuf::from("ratebridge.json"),
            PathBuf::from("ratebridge.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("ratebridge");
            paths.push(dir.join("config.yaml"));
            paths.push(dir.join("config.json"));
            paths.push(dir.join("config.toml"));
        }

        paths
    }

    /// Apply environment overrides read through `var`
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bundle) = var("RATEBRIDGE_BUNDLE").filter(|v| !v.is_empty()) {
            self.bundle = Some(PathBuf::from(bundle));
        }

        if let Some(timeout) = var("RATEBRIDGE_TIMEOUT_SECS") {
            self.http.request_timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::config(format!("RATEBRIDGE_TIMEOUT_SECS must be a whole number of seconds, got '{}'", timeout))
            })?;
        }

        Ok(())
    }

    /// Check the outbound call and cache settings
    pub fn validate(&self) -> Result<()> {
        self.http.validate()?;
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(Error::config("cache.maxEntries must be greater than zero when the cache is enabled"));
        }
        Ok(())
    }

    /// Let a `--bundle` argument take precedence over settings and environment
    pub fn override_bundle(&mut self, from_cli: Option<&Path>) {
        if let Some(path) = from_cli {
            self.bundle = Some(path.to_path_buf());
        }
    }

    /// The bundle to load, if one was configured anywhere
    pub fn bundle_path(&self) -> Result<PathBuf> {
        self.bundle.clone().ok_or(Error::MissingBundle)
    }
}
