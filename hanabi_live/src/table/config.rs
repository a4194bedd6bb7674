//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    GameOptions, Variant,
    constants::{IDLE_GAME_TIMEOUT, MAX_PLAYERS, MAX_USER_INPUT_LENGTH, MIN_PLAYERS},
};

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Maximum number of seated players (2-6)
    pub max_players: usize,

    /// Rules the game is played with
    pub options: GameOptions,

    /// Fixed seed for the deck shuffle. Random when unset.
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: 5,
            options: GameOptions::default(),
            seed: None,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Table name can't be empty".to_string());
        }

        if self.name.len() > MAX_USER_INPUT_LENGTH {
            return Err(format!(
                "Table name must be at most {MAX_USER_INPUT_LENGTH} characters"
            ));
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(format!(
                "Max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            ));
        }

        Variant::from_name(&self.options.variant).map_err(|e| e.to_string())?;

        if self.options.timed && self.options.base_time_secs == 0 {
            return Err("Timed games need a base time".to_string());
        }

        Ok(())
    }
}

/// Settings shared by every table a manager spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Tables without a command for this long end their game and close
    pub idle_timeout: Duration,

    /// Capacity of each table's command inbox
    pub inbox_capacity: usize,

    /// Notifications buffered per subscriber before they're dropped
    pub subscriber_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: IDLE_GAME_TIMEOUT,
            inbox_capacity: 100,
            subscriber_capacity: 256,
        }
    }
}

impl ManagerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.idle_timeout.is_zero() {
            return Err("Idle timeout must be greater than 0".to_string());
        }

        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be greater than 0".to_string());
        }

        if self.subscriber_capacity == 0 {
            return Err("Subscriber capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}
