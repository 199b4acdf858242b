//! TOML-based application configuration.
//!
//! Stores:
//! - The local user id that sessions and stats are recorded under
//! - Focus timer defaults (session length, allowed presets, subject)
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::session::DEFAULT_SUBJECT;
use crate::timer::{FocusTimer, DEFAULT_MINUTES, DEFAULT_PRESETS};

/// Who sessions are recorded for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

/// Focus timer defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
    #[serde(default = "default_presets")]
    pub presets: Vec<u32>,
    #[serde(default = "default_subject")]
    pub default_subject: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub focus: FocusConfig,
}

fn default_user_id() -> String {
    "local".into()
}
fn default_minutes() -> u32 {
    DEFAULT_MINUTES
}
fn default_presets() -> Vec<u32> {
    DEFAULT_PRESETS.to_vec()
}
fn default_subject() -> String {
    DEFAULT_SUBJECT.into()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
            presets: default_presets(),
            default_subject: default_subject(),
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
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|e| invalid(e.to_string()))?
                        .into(),
                ),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                // Hand edits get the same checks as `config set`.
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject settings the focus flow cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "profile.user_id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.focus.presets.is_empty() || self.focus.presets.contains(&0) {
            return Err(ConfigError::InvalidValue {
                key: "focus.presets".into(),
                message: "presets must be non-empty positive minute values".into(),
            });
        }
        if !self.focus.presets.contains(&self.focus.default_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "focus.default_minutes".into(),
                message: format!("{} is not one of {:?}", self.focus.default_minutes, self.focus.presets),
            });
        }
        Ok(())
    }

    /// A fresh timer using the configured defaults.
    pub fn timer(&self) -> FocusTimer {
        FocusTimer::new(self.focus.presets.clone(), self.focus.default_minutes)
            .with_subject(&self.focus.default_subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.profile.user_id, "local");
        assert_eq!(parsed.focus.presets, vec![15, 25, 50, 75]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[focus]\ndefault_minutes = 50\n").unwrap();
        assert_eq!(parsed.focus.default_minutes, 50);
        assert_eq!(parsed.focus.default_subject, "General");
        assert_eq!(parsed.profile.user_id, "local");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("focus.default_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("profile.user_id").as_deref(), Some("local"));
        assert_eq!(cfg.get("focus.presets").as_deref(), Some("[15,25,50,75]"));
        assert!(cfg.get("focus.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("focus.default_minutes", "50").unwrap();
        cfg.set("profile.user_id", "asha").unwrap();
        cfg.set("focus.presets", "[25, 45, 90]").unwrap_err();
        cfg.set("focus.presets", "[25, 50, 90]").unwrap();
        assert_eq!(cfg.focus.default_minutes, 50);
        assert_eq!(cfg.profile.user_id, "asha");
        assert_eq!(cfg.focus.presets, vec![25, 50, 90]);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("focus.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("focus.default_minutes", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn set_rejects_default_outside_presets() {
        let mut cfg = Config::default();
        let err = cfg.set("focus.default_minutes", "40").unwrap_err();
        assert!(err.to_string().contains("focus.default_minutes"));
        assert_eq!(cfg.focus.default_minutes, 25);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.focus.default_minutes, 25);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.set("focus.default_subject", "Chemistry").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().focus.default_subject, "Chemistry");
    }

    #[test]
    fn timer_uses_configured_defaults() {
        let mut cfg = Config::default();
        cfg.set("focus.default_minutes", "50").unwrap();
        cfg.set("focus.default_subject", "Physics").unwrap();
        let timer = cfg.timer();
        assert_eq!(timer.minutes(), 50);
        assert_eq!(timer.remaining_ms(), 50 * 60_000);
        assert_eq!(timer.subject(), "Physics");
    }

    #[test]
    fn load_from_rejects_hand_edited_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[focus]\ndefault_minutes = 40\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "focus.default_minutes"),
            "got {err:?}"
        );
    }
}
