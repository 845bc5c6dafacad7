//! # Terminal Configuration
//!
//! Per-terminal settings. The administrative live config (commission,
//! open sides, current event) is not here; it lives in the database and
//! is watched by [`ConfigWatcher`](crate::watcher::ConfigWatcher).
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RINGSIDE_TELLER_ID=teller-9                                        │
//! │     RINGSIDE_DB_PATH=/var/lib/ringside/ringside.db                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ringside/terminal.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     teller-1, ./ringside.db, UTC+08:00, 5s refresh                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # terminal.toml
//! [teller]
//! id = "teller-9"
//! name = "Ana"
//!
//! [storage]
//! db_path = "/var/lib/ringside/ringside.db"
//!
//! [clock]
//! utc_offset_minutes = 480  # partitions roll over at local midnight
//!
//! [live]
//! refresh_secs = 5
//! initial_backoff_ms = 500
//! max_backoff_secs = 30
//! wager_order = "descending"
//! ```

use backoff::ExponentialBackoff;
use ringside_core::validation::{validate_display_name, validate_identifier, validate_utc_offset};
use ringside_core::{PartitionResolver, TellerIdentity, WagerOrder, DEFAULT_UTC_OFFSET_MINUTES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Teller
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TellerSettings {
    /// Teller account id; also namespaces this teller's wagers.
    #[serde(default = "default_teller_id")]
    pub id: String,

    /// Name printed on receipts.
    #[serde(default = "default_teller_name")]
    pub name: String,
}

fn default_teller_id() -> String {
    "teller-1".to_string()
}

fn default_teller_name() -> String {
    "Teller 1".to_string()
}

impl Default for TellerSettings {
    fn default() -> Self {
        TellerSettings {
            id: default_teller_id(),
            name: default_teller_name(),
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ringside.db")
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            db_path: default_db_path(),
        }
    }
}

// =============================================================================
// Clock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSettings {
    /// Offset used to decide which month a timestamp belongs to.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_utc_offset() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

impl Default for ClockSettings {
    fn default() -> Self {
        ClockSettings {
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

// =============================================================================
// Live Settings
// =============================================================================

/// How the live views poll and recover.
///
/// ```text
/// refresh_secs        reload every partition feed at least this often;
///                     also how often month rollover is checked
/// initial_backoff_ms  first wait after a feed fails
/// max_backoff_secs    cap for the doubling wait between retries
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSettings {
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    #[serde(default)]
    pub wager_order: WagerOrder,
}

fn default_refresh_secs() -> u64 {
    5
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    30
}

impl Default for LiveSettings {
    fn default() -> Self {
        LiveSettings {
            refresh_secs: default_refresh_secs(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            wager_order: WagerOrder::default(),
        }
    }
}

impl LiveSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    /// Retry schedule for a failing feed. Never gives up on its own; the
    /// feed stops when its session generation is cancelled.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.initial_backoff_ms),
            max_interval: Duration::from_secs(self.max_backoff_secs),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Terminal Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub teller: TellerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub clock: ClockSettings,

    #[serde(default)]
    pub live: LiveSettings,
}

impl TerminalConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (terminal.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load terminal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Terminal config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.teller.id.trim().is_empty() {
            return Err(SyncError::MissingTellerId);
        }
        validate_identifier("teller.id", &self.teller.id)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        validate_display_name(&self.teller.name).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        validate_utc_offset(self.clock.utc_offset_minutes)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if self.live.refresh_secs == 0 {
            return Err(SyncError::InvalidConfig("refresh_secs must be greater than 0".into()));
        }
        if self.live.initial_backoff_ms == 0 || self.live.max_backoff_secs == 0 {
            return Err(SyncError::InvalidConfig("backoff bounds must be greater than 0".into()));
        }
        if Duration::from_millis(self.live.initial_backoff_ms) > Duration::from_secs(self.live.max_backoff_secs) {
            return Err(SyncError::InvalidConfig(
                "initial_backoff_ms must not exceed max_backoff_secs".into(),
            ));
        }

        Ok(())
    }

    /// Applies `RINGSIDE_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("RINGSIDE_TELLER_ID") {
            debug!(teller_id = %id, "Overriding teller ID from environment");
            self.teller.id = id;
        }

        if let Some(name) = lookup("RINGSIDE_TELLER_NAME") {
            self.teller.name = name;
        }

        if let Some(path) = lookup("RINGSIDE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.db_path = PathBuf::from(path);
        }

        if let Some(offset) = lookup("RINGSIDE_UTC_OFFSET_MINUTES") {
            match offset.parse::<i32>() {
                Ok(minutes) => self.clock.utc_offset_minutes = minutes,
                Err(_) => warn!(value = %offset, "Ignoring non-numeric RINGSIDE_UTC_OFFSET_MINUTES"),
            }
        }

        if let Some(secs) = lookup("RINGSIDE_REFRESH_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => self.live.refresh_secs = secs,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric RINGSIDE_REFRESH_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "ringside", "ringside")
            .map(|dirs| dirs.config_dir().join("terminal.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn teller_identity(&self) -> TellerIdentity {
        TellerIdentity {
            id: self.teller.id.clone(),
            name: self.teller.name.clone(),
        }
    }

    pub fn resolver(&self) -> SyncResult<PartitionResolver> {
        Ok(PartitionResolver::new(self.clock.utc_offset_minutes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TerminalConfig::default();
        assert_eq!(config.teller.id, "teller-1");
        assert_eq!(config.clock.utc_offset_minutes, 480);
        assert_eq!(config.live.wager_order, WagerOrder::Descending);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TerminalConfig::default();

        config.teller.id = "  ".to_string();
        assert!(matches!(config.validate(), Err(SyncError::MissingTellerId)));

        config.teller.id = "teller,9".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        config.teller.id = "teller-9".to_string();
        config.clock.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        config.clock.utc_offset_minutes = -300;
        config.live.refresh_secs = 0;
        assert!(config.validate().is_err());

        config.live.refresh_secs = 1;
        config.live.initial_backoff_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config: TerminalConfig = toml::from_str(
            r#"
            [teller]
            id = "teller-2"
            name = "Ben"

            [live]
            refresh_secs = 10
            wager_order = "ascending"
            "#,
        )
        .unwrap();
        assert_eq!(config.live.wager_order, WagerOrder::Ascending);
        assert_eq!(config.live.max_backoff_secs, 30);

        let env: HashMap<&str, &str> = [
            ("RINGSIDE_TELLER_ID", "teller-9"),
            ("RINGSIDE_DB_PATH", "/tmp/ringside.db"),
            ("RINGSIDE_UTC_OFFSET_MINUTES", "-300"),
            ("RINGSIDE_REFRESH_SECS", "soon"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.teller.id, "teller-9");
        assert_eq!(config.teller.name, "Ben");
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/ringside.db"));
        assert_eq!(config.clock.utc_offset_minutes, -300);
        assert_eq!(config.live.refresh_secs, 10);
    }

    #[test]
    fn test_toml_serialization() {
        let config = TerminalConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[teller]"));
        assert!(toml_str.contains("[clock]"));
        let back: TerminalConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_backoff_is_unbounded_in_time() {
        let settings = LiveSettings::default();
        let backoff = settings.backoff();
        assert_eq!(backoff.initial_interval, Duration::from_millis(500));
        assert_eq!(backoff.max_interval, Duration::from_secs(30));
        assert!(backoff.max_elapsed_time.is_none());
    }
}
