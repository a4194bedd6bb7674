//! # Hanabi Live
//!
//! A cooperative card game table engine. Players see each other's cards but
//! not their own, and win together by playing every suit in rank order.
//!
//! The crate is split in three layers:
//!
//! - [`game`]: the rules. A [`Game`] validates and applies one move at a
//!   time, appending everything that happened to an ordered action log.
//! - [`table`]: many concurrent tables. Each table is an actor task that owns
//!   its game; the [`TableManager`] routes requests to it and subscribers get
//!   the action log as it grows.
//! - [`history`]: records of finished games and the [`GameRecorder`] hook
//!   that persists them.
//!
//! ## Example
//!
//! ```
//! use hanabi_live::{Game, GameCommand, GameOptions, GameSetup};
//!
//! let setup = GameSetup {
//!     options: GameOptions::default(),
//!     player_names: vec!["Alice".to_string(), "Bob".to_string()],
//!     seed: 1,
//! };
//! let mut game = Game::new(setup).unwrap();
//! assert_eq!(game.data.clues, 8);
//!
//! // Discarding at full clue tokens isn't allowed.
//! let legal = game.legal_commands();
//! assert!(!legal.iter().any(|c| matches!(c, GameCommand::Discard { .. })));
//!
//! let first_card = game.players[0].hand[0];
//! game.apply(0, GameCommand::Play { order: first_card }).unwrap();
//! assert_eq!(game.data.turn, 1);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Action, Clue, EndCondition, Game, GameCommand, GameError, GameOptions, GameSetup, GameStatus,
    LoggedAction, Variant,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
};

/// Finished-game records and persistence.
pub mod history;
pub use history::{GameRecord, GameRecorder, MemoryRecorder};

/// Multi-table support with the actor model.
pub mod table;
pub use table::{ManagerConfig, TableConfig, TableError, TableHandle, TableManager};
