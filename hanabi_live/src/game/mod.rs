//! Cooperative card game engine.
//!
//! - [`entities`]: cards, clues and the deck
//! - [`variant`]: rule sets resolved from a variant name
//! - [`character`]: optional per-seat abilities
//! - [`player`]: the per-seat operations (clue, play, discard, draw)
//! - [`state_machine`]: turn order, validation and game end
//! - [`actions`]: the append-only event log
//! - [`replay`]: rebuilding a game from its log

pub mod actions;
pub mod character;
pub mod constants;
pub mod entities;
pub mod player;
pub mod replay;
pub mod state_machine;
pub mod variant;

pub use actions::{Action, ActionLog, EndCondition, LoggedAction, Which};
pub use character::Character;
pub use entities::{Card, CardIdentity, Clue, ClueKind, Deck, Order, Rank, SeatIndex, Sound, SuitIndex};
pub use player::Player;
pub use replay::{ReplayError, ReplayStep, replay, steps_from_log};
pub use state_machine::{
    Game, GameCommand, GameData, GameError, GameOptions, GameSetup, GameStatus, GameSummary,
    MoveOutcome, SetupError,
};
pub use variant::{StackDirection, Variant, VariantError};
