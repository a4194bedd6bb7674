//! Persistence boundary for finished games.
//!
//! Storage itself lives outside this crate. Tables hand every finished game
//! to a [`GameRecorder`]; [`MemoryRecorder`] keeps them in memory for tests
//! and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::models::{BestScore, BestScoreDelta, GameRecord};
use crate::table::UserId;

#[async_trait]
pub trait GameRecorder: Send + Sync {
    /// A player's best score for a variant at a player count
    async fn best_score(
        &self,
        user_id: UserId,
        variant: &str,
        num_players: usize,
    ) -> anyhow::Result<Option<BestScore>>;

    /// Store a finished game, applying its best score deltas
    async fn record_game(&self, record: GameRecord) -> anyhow::Result<()>;
}

/// Work out which players improved their best score, attach the deltas to
/// the record and hand it to the recorder.
///
/// # Errors
///
/// Propagates recorder failures.
pub async fn persist_finished_game(
    recorder: &dyn GameRecorder,
    mut record: GameRecord,
) -> anyhow::Result<Vec<BestScoreDelta>> {
    let current = record.best_score();
    let num_players = record.players.len();

    let mut deltas = Vec::new();
    for player in &record.players {
        let previous = recorder
            .best_score(player.user_id, &record.variant, num_players)
            .await?;
        let improved = previous.is_none_or(|best| current.is_better_than(&best));
        if improved {
            deltas.push(BestScoreDelta {
                user_id: player.user_id,
                previous,
                current,
            });
        }
    }

    record.best_score_deltas = deltas.clone();
    log::info!(
        "recording game {} ({}, score {}, {} best score updates)",
        record.id,
        record.variant,
        record.score,
        deltas.len()
    );
    recorder.record_game(record).await?;
    Ok(deltas)
}

type BestScoreKey = (UserId, String, usize);

/// In-memory recorder
#[derive(Default)]
pub struct MemoryRecorder {
    games: Mutex<Vec<GameRecord>>,
    best_scores: Mutex<HashMap<BestScoreKey, BestScore>>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn games(&self) -> Vec<GameRecord> {
        self.games.lock().await.clone()
    }

    pub async fn game_count(&self) -> usize {
        self.games.lock().await.len()
    }
}

#[async_trait]
impl GameRecorder for MemoryRecorder {
    async fn best_score(
        &self,
        user_id: UserId,
        variant: &str,
        num_players: usize,
    ) -> anyhow::Result<Option<BestScore>> {
        let best_scores = self.best_scores.lock().await;
        Ok(best_scores
            .get(&(user_id, variant.to_string(), num_players))
            .copied())
    }

    async fn record_game(&self, record: GameRecord) -> anyhow::Result<()> {
        {
            let mut best_scores = self.best_scores.lock().await;
            for delta in &record.best_score_deltas {
                best_scores.insert(
                    (delta.user_id, record.variant.clone(), record.players.len()),
                    delta.current,
                );
            }
        }
        self.games.lock().await.push(record);
        Ok(())
    }
}
