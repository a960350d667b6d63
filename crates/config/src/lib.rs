//! Configuration loading, validation, and management for contextkeeper.
//!
//! Loads configuration from `~/.contextkeeper/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.contextkeeper/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Context store configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Keyword extraction configuration
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Session persistence configuration
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Turn Context cap (user and assistant messages combined) for new
    /// sessions. Restored and imported sessions keep the cap stored in their
    /// snapshot until they are reset.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    6
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Keywords returned by explicit extraction and debug output
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Keywords stored alongside each processed user message
    #[serde(default = "default_message_top_k")]
    pub message_top_k: usize,
}

fn default_top_k() -> usize {
    5
}
fn default_message_top_k() -> usize {
    3
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            message_top_k: default_message_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Write a snapshot after every mutating session access
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Snapshot directory (default: `~/.contextkeeper/sessions`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: true,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.contextkeeper/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `CONTEXTKEEPER_MAX_TURNS`
    /// - `CONTEXTKEEPER_SESSIONS_DIR`
    /// - `CONTEXTKEEPER_PERSIST` (`0` / `false` disables persistence)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CONTEXTKEEPER_MAX_TURNS") {
            self.context.max_turns = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CONTEXTKEEPER_MAX_TURNS must be a positive integer, got {raw:?}"
                ))
            })?;
        }

        if let Some(dir) = lookup("CONTEXTKEEPER_SESSIONS_DIR") {
            self.sessions.dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup("CONTEXTKEEPER_PERSIST") {
            self.sessions.persist = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".contextkeeper")
    }

    /// Where session snapshots are written.
    pub fn sessions_dir(&self) -> PathBuf {
        self.sessions
            .dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("sessions"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_turns must be at least 1".into(),
            ));
        }

        if self.keywords.top_k == 0 || self.keywords.message_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "keywords.top_k and keywords.message_top_k must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.context.max_turns, 6);
        assert_eq!(config.keywords.top_k, 5);
        assert_eq!(config.keywords.message_top_k, 3);
        assert!(config.sessions.persist);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.context.max_turns, config.context.max_turns);
        assert_eq!(parsed.sessions.persist, config.sessions.persist);
    }

    #[test]
    fn zero_max_turns_rejected() {
        let mut config = AppConfig::default();
        config.context.max_turns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().context.max_turns, 6);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[context]\nmax_turns = 10\n").unwrap();
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.context.max_turns, 10);
        assert_eq!(config.keywords.top_k, 5);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[context\nmax_turns = ").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("CONTEXTKEEPER_MAX_TURNS", "8"),
                ("CONTEXTKEEPER_SESSIONS_DIR", "/var/lib/ck"),
                ("CONTEXTKEEPER_PERSIST", "false"),
            ]))
            .unwrap();
        assert_eq!(config.context.max_turns, 8);
        assert_eq!(config.sessions_dir(), PathBuf::from("/var/lib/ck"));
        assert!(!config.sessions.persist);
    }

    #[test]
    fn bad_env_override_rejected() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_overrides(env(&[("CONTEXTKEEPER_MAX_TURNS", "many")]))
            .is_err());
        assert!(config
            .apply_overrides(env(&[("CONTEXTKEEPER_MAX_TURNS", "0")]))
            .is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_turns = 6"));
        assert!(toml_str.contains("persist = true"));
    }
}
