//! Configuration types for Turnwatch.
//!
//! The settings file keeps the flat key names of the original bot
//! (`refresh_time`, `page_reread_attempts`, ...) so existing `settings.yaml`
//! files load unchanged. Durations in the file are whole seconds.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Top-level configuration for Turnwatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnwatchConfig {
    /// Seconds between poll cycles of a single game.
    #[serde(default = "default_refresh_time")]
    pub refresh_time: u64,

    /// Reads of an already-loaded page per cycle before giving up on it.
    #[serde(default = "default_reread_attempts")]
    pub page_reread_attempts: u32,

    /// Seconds to pause between reads of the same page.
    #[serde(default = "default_reread_pause")]
    pub page_reread_pause: u64,

    /// Consecutive failed cycles after which a game is declared over.
    #[serde(default = "default_reload_attempts")]
    pub page_reload_attempts: u32,

    /// Seconds a `mute` stays in effect.
    #[serde(default = "default_mute_window")]
    pub mute_window: u64,

    /// Where the registry document is persisted.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Guild used by the console command router.
    #[serde(default = "default_guild")]
    pub guild: String,

    /// Channel new games report into when followed from the console.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Page oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Outbound message settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
}

fn default_refresh_time() -> u64 {
    60
}

fn default_reread_attempts() -> u32 {
    3
}

fn default_reread_pause() -> u64 {
    5
}

fn default_reload_attempts() -> u32 {
    5
}

fn default_mute_window() -> u64 {
    3600 // 1 hour
}

fn default_data_file() -> String {
    "data.json".to_string()
}

fn default_guild() -> String {
    "local".to_string()
}

fn default_channel() -> String {
    "console".to_string()
}

impl Default for TurnwatchConfig {
    fn default() -> Self {
        Self {
            refresh_time: default_refresh_time(),
            page_reread_attempts: default_reread_attempts(),
            page_reread_pause: default_reread_pause(),
            page_reload_attempts: default_reload_attempts(),
            mute_window: default_mute_window(),
            data_file: default_data_file(),
            guild: default_guild(),
            channel: default_channel(),
            oracle: OracleConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

/// Settings for the HTTP page oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Regex run against the page body. The `name` capture group (or the first
    /// group when unnamed) is the active player.
    #[serde(default = "default_active_player_pattern")]
    pub active_player_pattern: String,

    /// Page load timeout in seconds.
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with page requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_active_player_pattern() -> String {
    r#"data-active-player="(?P<name>[^"]*)""#.to_string()
}

fn default_page_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    concat!("turnwatch/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            active_player_pattern: default_active_player_pattern(),
            timeout_secs: default_page_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Settings for outbound messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Per-request timeout in seconds for webhook channels.
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notify_timeout(),
        }
    }
}

impl TurnwatchConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path_ref)?;
        let config: Self = serde_yaml::from_str(&content)?;
        debug!(
            refresh_time = config.refresh_time,
            page_reload_attempts = config.page_reload_attempts,
            data_file = %config.data_file,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Rejects settings that would make the watcher spin or never conclude.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_time == 0 {
            return Err(ConfigError::Invalid(
                "refresh_time must be at least 1 second".to_string(),
            ));
        }
        if self.page_reread_attempts == 0 {
            return Err(ConfigError::Invalid(
                "page_reread_attempts must be at least 1".to_string(),
            ));
        }
        if self.page_reload_attempts == 0 {
            return Err(ConfigError::Invalid(
                "page_reload_attempts must be at least 1".to_string(),
            ));
        }
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::Invalid("data_file must not be empty".to_string()));
        }
        Ok(())
    }

    /// Runtime timings for watchers.
    pub fn watcher_settings(&self) -> WatcherSettings {
        WatcherSettings {
            refresh_interval: Duration::from_secs(self.refresh_time),
            reread_attempts: self.page_reread_attempts,
            reread_pause: Duration::from_secs(self.page_reread_pause),
            reload_attempts: self.page_reload_attempts,
            mute_window: Duration::from_secs(self.mute_window),
        }
    }
}

/// Timings and retry limits a watcher runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    pub refresh_interval: Duration,
    pub reread_attempts: u32,
    pub reread_pause: Duration,
    pub reload_attempts: u32,
    pub mute_window: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        TurnwatchConfig::default().watcher_settings()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TurnwatchConfig::default();
        assert_eq!(config.refresh_time, 60);
        assert_eq!(config.page_reread_attempts, 3);
        assert_eq!(config.page_reload_attempts, 5);
        assert_eq!(config.mute_window, 3600);
        assert_eq!(config.data_file, "data.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_original_settings_file() {
        let yaml = r#"
refresh_time: 30
page_reread_attempts: 4
page_reread_pause: 2
page_reload_attempts: 10
"#;
        let config: TurnwatchConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.refresh_time, 30);
        assert_eq!(config.page_reread_attempts, 4);
        assert_eq!(config.page_reread_pause, 2);
        assert_eq!(config.page_reload_attempts, 10);
        // Unspecified keys fall back to defaults
        assert_eq!(config.mute_window, 3600);
        assert_eq!(config.guild, "local");
    }

    #[test]
    fn test_nested_sections() {
        let yaml = r#"
oracle:
  active_player_pattern: 'class="active">(\w+)<'
  timeout_secs: 5
notifier:
  timeout_secs: 3
"#;
        let config: TurnwatchConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.oracle.active_player_pattern, r#"class="active">(\w+)<"#);
        assert_eq!(config.oracle.timeout_secs, 5);
        assert!(config.oracle.user_agent.starts_with("turnwatch/"));
        assert_eq!(config.notifier.timeout_secs, 3);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let yaml = r#"
refresh_time: 10
discord_prefix: "--"
"#;
        let config: TurnwatchConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.refresh_time, 10);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = TurnwatchConfig {
            page_reload_attempts: 0,
            ..TurnwatchConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("page_reload_attempts")));

        let config = TurnwatchConfig {
            page_reread_attempts: 0,
            ..TurnwatchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TurnwatchConfig {
            refresh_time: 0,
            ..TurnwatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watcher_settings_conversion() {
        let config = TurnwatchConfig {
            refresh_time: 45,
            page_reread_pause: 7,
            mute_window: 600,
            ..TurnwatchConfig::default()
        };
        let settings = config.watcher_settings();
        assert_eq!(settings.refresh_interval, Duration::from_secs(45));
        assert_eq!(settings.reread_pause, Duration::from_secs(7));
        assert_eq!(settings.mute_window, Duration::from_secs(600));
        assert_eq!(settings.reread_attempts, 3);
        assert_eq!(settings.reload_attempts, 5);
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = TurnwatchConfig::from_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
