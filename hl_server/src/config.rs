//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use hanabi_live::{
    MAX_PLAYERS, MIN_PLAYERS, Variant,
    table::{ManagerConfig, TableConfig},
};
use std::{path::PathBuf, time::Duration};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Settings shared by every table
    pub manager: ManagerConfig,
    /// Table defaults configuration
    pub table_defaults: TableDefaultsConfig,
    /// Number of tables to create on startup
    pub num_tables: usize,
    /// Where finished games are written as JSON, if anywhere
    pub record_dir: Option<PathBuf>,
    /// How often table stats are logged and stopped tables pruned
    pub stats_interval: Duration,
}

/// Default table configuration
#[derive(Debug, Clone)]
pub struct TableDefaultsConfig {
    /// Maximum players per table
    pub max_players: usize,
    /// Variant name
    pub variant: String,
    pub timed: bool,
    pub base_time_secs: u64,
    pub time_per_turn_secs: u64,
}

impl TableDefaultsConfig {
    /// Table configuration for the `n`th lobby table
    pub fn table_config(&self, n: usize) -> TableConfig {
        let mut config = TableConfig {
            name: format!("Table {n}"),
            max_players: self.max_players,
            ..TableConfig::default()
        };
        config.options.variant = self.variant.clone();
        config.options.timed = self.timed;
        config.options.base_time_secs = self.base_time_secs;
        config.options.time_per_turn_secs = self.time_per_turn_secs;
        config
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `num_tables_override` - Optional number of tables override (from CLI args)
    /// * `record_dir_override` - Optional record directory override (from CLI args)
    pub fn from_env(
        num_tables_override: Option<usize>,
        record_dir_override: Option<PathBuf>,
    ) -> Self {
        let defaults = ManagerConfig::default();
        let manager = ManagerConfig {
            idle_timeout: Duration::from_secs(parse_env_or(
                "IDLE_GAME_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )),
            inbox_capacity: parse_env_or("TABLE_INBOX_CAPACITY", defaults.inbox_capacity),
            subscriber_capacity: parse_env_or("SUBSCRIBER_BUFFER", defaults.subscriber_capacity),
        };

        let table_defaults = TableDefaultsConfig {
            max_players: parse_env_or("TABLE_MAX_PLAYERS", 5),
            variant: std::env::var("DEFAULT_VARIANT")
                .unwrap_or_else(|_| hanabi_live::game::variant::DEFAULT_VARIANT.to_string()),
            timed: parse_env_or("TIMED_GAMES", false),
            base_time_secs: parse_env_or("TIMED_BASE_SECS", 120),
            time_per_turn_secs: parse_env_or("TIMED_TURN_SECS", 20),
        };

        let num_tables = num_tables_override.unwrap_or_else(|| parse_env_or("NUM_TABLES", 1));
        let record_dir =
            record_dir_override.or_else(|| std::env::var("RECORD_DIR").ok().map(PathBuf::from));

        ServerConfig {
            manager,
            table_defaults,
            num_tables,
            record_dir,
            stats_interval: Duration::from_secs(parse_env_or("STATS_INTERVAL_SECS", 60)),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manager.idle_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "IDLE_GAME_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.manager.inbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "TABLE_INBOX_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.manager.subscriber_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SUBSCRIBER_BUFFER".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.stats_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "STATS_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        // Validate player count
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.table_defaults.max_players) {
            return Err(ConfigError::Invalid {
                var: "TABLE_MAX_PLAYERS".to_string(),
                reason: format!("Must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
            });
        }

        if let Err(e) = Variant::from_name(&self.table_defaults.variant) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_VARIANT".to_string(),
                reason: e.to_string(),
            });
        }

        if self.table_defaults.timed && self.table_defaults.base_time_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TIMED_BASE_SECS".to_string(),
                reason: "Timed games need a base time".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
