//! Finished-game records and the persistence boundary.
//!
//! Tables build a [`GameRecord`] when a game ends and pass it to
//! [`persist_finished_game`], which works out best-score deltas before
//! handing the record to a [`GameRecorder`].

pub mod models;
pub mod recorder;

pub use models::{BestScore, BestScoreDelta, GameRecord, PlayerRecord, ScoreModifier};
pub use recorder::{GameRecorder, MemoryRecorder, persist_finished_game};
