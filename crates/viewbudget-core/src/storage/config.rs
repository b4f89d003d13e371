//! TOML-based application configuration.
//!
//! Stores:
//! - The site allow-list (userscript match patterns)
//! - The default daily limit used until the user saves one
//! - The daily reset boundary
//! - The accounting tick interval
//! - The display locale
//!
//! Configuration is stored at `~/.config/viewbudget/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use super::ledger::{ResetBoundary, DEFAULT_LIMIT_MINUTES};
use crate::display::Locale;
use crate::error::{ConfigError, CoreError, Result};
use crate::site::SiteMatcher;

/// Pages the engine runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Limit in minutes applied while no limit has been saved for an origin.
    #[serde(default = "default_limit_minutes")]
    pub default_minutes: u32,
}

/// Local time of day after which the ledger is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    #[serde(default = "default_reset_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub locale: Locale,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/viewbudget/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sites: SitesConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub reset: ResetConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

// Default functions
fn default_patterns() -> Vec<String> {
    vec![
        "*://*.youtube.com/*".to_string(),
        "*://*.bilibili.com/*".to_string(),
    ]
}
fn default_limit_minutes() -> u32 {
    DEFAULT_LIMIT_MINUTES
}
fn default_reset_hour() -> u32 {
    18
}
fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_limit_minutes(),
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            hour: default_reset_hour(),
            minute: 0,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            locale: Locale::ZhCn,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        if key.is_empty() {
            return Err(unknown());
        }

        let mut parts = key.split('.').peekable();

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Array(_) => {
                        // Arrays accept either JSON or a comma-separated list.
                        serde_json::from_str(value).unwrap_or_else(|_| {
                            serde_json::Value::Array(
                                value
                                    .split(',')
                                    .map(str::trim)
                                    .filter(|s| !s.is_empty())
                                    .map(|s| serde_json::Value::String(s.to_string()))
                                    .collect(),
                            )
                        })
                    }
                    serde_json::Value::Object(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default path, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the defaults cannot
    /// be written.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    /// Persist to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. The result is validated as
    /// a whole; on error `self` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed or
    /// the resulting configuration is invalid.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value is invalid,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site_matcher().map_err(|e| ConfigError::InvalidValue {
            key: "sites.patterns".into(),
            message: e.to_string(),
        })?;
        ResetBoundary::new(self.reset.hour, self.reset.minute).map_err(|e| {
            ConfigError::InvalidValue {
                key: "reset".into(),
                message: e.to_string(),
            }
        })?;
        if self.limits.default_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits.default_minutes".into(),
                message: "must be positive".into(),
            });
        }
        if self.engine.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.tick_interval_ms".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if any configured pattern is malformed.
    pub fn site_matcher(&self) -> Result<SiteMatcher, crate::error::ValidationError> {
        SiteMatcher::from_patterns(&self.sites.patterns)
    }

    /// Configured reset boundary, or 18:00 if the stored one is out of range.
    pub fn reset_boundary(&self) -> ResetBoundary {
        ResetBoundary::new(self.reset.hour, self.reset.minute).unwrap_or_default()
    }
}
