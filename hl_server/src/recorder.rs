//! Recorder used by the server: keeps best scores in memory and optionally
//! writes every finished game to a JSON file.

use anyhow::Context;
use async_trait::async_trait;
use hanabi_live::{
    GameRecord, GameRecorder, MemoryRecorder,
    history::BestScore,
    table::UserId,
};
use std::path::PathBuf;

use crate::logging::log_finished_game;

pub struct JsonRecorder {
    memory: MemoryRecorder,
    dir: Option<PathBuf>,
}

impl JsonRecorder {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            memory: MemoryRecorder::new(),
            dir,
        }
    }

    pub async fn game_count(&self) -> usize {
        self.memory.game_count().await
    }
}

#[async_trait]
impl GameRecorder for JsonRecorder {
    async fn best_score(
        &self,
        user_id: UserId,
        variant: &str,
        num_players: usize,
    ) -> anyhow::Result<Option<BestScore>> {
        self.memory.best_score(user_id, variant, num_players).await
    }

    async fn record_game(&self, record: GameRecord) -> anyhow::Result<()> {
        log_finished_game(
            record.table_id,
            &record.variant,
            record.score,
            &record.end_condition.to_string(),
        );

        if let Some(dir) = &self.dir {
            let json = serde_json::to_vec_pretty(&record)?;
            let path = dir.join(format!("{}.json", record.id));
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Wrote game record");
        }

        self.memory.record_game(record).await
    }
}
