//! Table manager for spawning and managing multiple table actors.

use super::{
    TableId, UserId,
    actor::{TableActor, TableHandle},
    config::{ManagerConfig, TableConfig},
    errors::TableError,
    messages::{Notification, TableMessage, TableStateResponse, TableStatus, TableSummary},
};
use crate::{
    game::{GameCommand, LoggedAction, Order},
    history::{GameRecord, GameRecorder},
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Table counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub waiting: usize,
    pub running: usize,
    pub finished: usize,
    pub replays: usize,
}

impl ManagerStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.waiting + self.running + self.finished + self.replays
    }
}

/// Table manager for managing multiple table instances
///
/// The registry lock is only held to look up, insert or remove handles. All
/// table work happens in the table's own task.
pub struct TableManager {
    config: ManagerConfig,

    /// Receives every finished game
    recorder: Arc<dyn GameRecorder>,

    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,

    /// Next table ID
    next_table_id: Arc<RwLock<TableId>>,
}

impl TableManager {
    /// Create a new table manager
    pub fn new(config: ManagerConfig, recorder: Arc<dyn GameRecorder>) -> Self {
        Self {
            config,
            recorder,
            tables: Arc::new(RwLock::new(HashMap::new())),
            next_table_id: Arc::new(RwLock::new(1)),
        }
    }

    async fn allocate_id(&self) -> TableId {
        let mut next_id = self.next_table_id.write().await;
        let table_id = *next_id;
        *next_id += 1;
        table_id
    }

    async fn spawn(&self, actor: TableActor, handle: TableHandle) {
        let table_id = handle.table_id();
        let mut tables = self.tables.write().await;
        tables.insert(table_id, handle);
        drop(tables);

        tokio::spawn(async move {
            actor.run().await;
        });
    }

    /// Create and spawn a new table
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the table or manager configuration doesn't
    /// validate.
    pub async fn create_table(
        &self,
        config: TableConfig,
        owner: UserId,
    ) -> Result<TableId, TableError> {
        self.config.validate().map_err(TableError::InvalidConfig)?;
        config.validate().map_err(TableError::InvalidConfig)?;

        let table_id = self.allocate_id().await;
        let (actor, handle) =
            TableActor::new(table_id, config, owner, self.recorder.clone(), self.config);
        self.spawn(actor, handle).await;

        log::info!("Created and spawned table {}", table_id);
        Ok(table_id)
    }

    /// Open a replay of the game that finished at another table
    ///
    /// # Errors
    ///
    /// Returns `NotApplicable` if that table has no finished game.
    pub async fn create_replay(
        &self,
        source: TableId,
        owner: UserId,
    ) -> Result<TableId, TableError> {
        let record = self
            .handle(source)
            .await?
            .request(|response| TableMessage::GetRecord { response })
            .await?
            .ok_or(TableError::NotApplicable)?;
        self.create_replay_from_record(&record, owner).await
    }

    /// Open a replay of a stored game
    ///
    /// # Errors
    ///
    /// Fails if the record's actions don't replay against its deck.
    pub async fn create_replay_from_record(
        &self,
        record: &GameRecord,
        owner: UserId,
    ) -> Result<TableId, TableError> {
        self.config.validate().map_err(TableError::InvalidConfig)?;
        let table_id = self.allocate_id().await;
        let (actor, handle) =
            TableActor::replay_of(table_id, record, owner, self.recorder.clone(), self.config)?;
        self.spawn(actor, handle).await;

        log::info!("Created replay table {} of game {}", table_id, record.id);
        Ok(table_id)
    }

    /// Get a table handle
    pub async fn get_table(&self, table_id: TableId) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(&table_id).cloned()
    }

    async fn handle(&self, table_id: TableId) -> Result<TableHandle, TableError> {
        self.get_table(table_id)
            .await
            .ok_or(TableError::NotFound(table_id))
    }

    /// Route a game move to its table. Returns the actions it produced, as
    /// the mover sees them.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables, `NotApplicable` when no game is
    /// running there, and `Rejected` when the game refuses the move.
    pub async fn apply_command(
        &self,
        table_id: TableId,
        user_id: UserId,
        command: GameCommand,
    ) -> Result<Vec<LoggedAction>, TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::Command {
                user_id,
                command,
                response,
            })
            .await?
    }

    /// Join a table
    pub async fn join_table(
        &self,
        table_id: TableId,
        user_id: UserId,
        username: String,
    ) -> Result<(), TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::Join {
                user_id,
                username,
                response,
            })
            .await?
    }

    /// Leave a table. The table closes once nobody is left.
    pub async fn leave_table(&self, table_id: TableId, user_id: UserId) -> Result<(), TableError> {
        let outcome = self
            .handle(table_id)
            .await?
            .request(|response| TableMessage::Leave { user_id, response })
            .await??;

        if outcome.table_empty {
            self.close_table(table_id).await?;
        }
        Ok(())
    }

    pub async fn spectate(
        &self,
        table_id: TableId,
        user_id: UserId,
        username: String,
    ) -> Result<(), TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::Spectate {
                user_id,
                username,
                response,
            })
            .await?
    }

    pub async fn stop_spectating(
        &self,
        table_id: TableId,
        user_id: UserId,
    ) -> Result<(), TableError> {
        let outcome = self
            .handle(table_id)
            .await?
            .request(|response| TableMessage::StopSpectating { user_id, response })
            .await??;

        if outcome.table_empty {
            self.close_table(table_id).await?;
        }
        Ok(())
    }

    /// Deal the game. Only the table owner can start it.
    pub async fn start_game(&self, table_id: TableId, user_id: UserId) -> Result<(), TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::Start { user_id, response })
            .await?
    }

    pub async fn send_chat(
        &self,
        table_id: TableId,
        user_id: UserId,
        message: String,
    ) -> Result<(), TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::Chat {
                user_id,
                message,
                response,
            })
            .await?
    }

    pub async fn set_note(
        &self,
        table_id: TableId,
        user_id: UserId,
        order: Order,
        note: String,
    ) -> Result<(), TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::SetNote {
                user_id,
                order,
                note,
                response,
            })
            .await?
    }

    /// Subscribe to a table's notifications. The first notification is the
    /// backlog of everything that already happened.
    pub async fn subscribe(
        &self,
        table_id: TableId,
        user_id: Option<UserId>,
    ) -> Result<(Uuid, mpsc::Receiver<Notification>), TableError> {
        let handle = self.handle(table_id).await?;
        let session_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.config.subscriber_capacity);
        handle
            .request(|response| TableMessage::Subscribe {
                session_id,
                user_id,
                sender,
                response,
            })
            .await??;
        Ok((session_id, receiver))
    }

    pub async fn unsubscribe(&self, table_id: TableId, session_id: Uuid) -> Result<(), TableError> {
        self.handle(table_id)
            .await?
            .send(TableMessage::Unsubscribe { session_id })
            .await
    }

    /// Get table state
    ///
    /// # Arguments
    ///
    /// * `table_id` - Table ID
    /// * `user_id` - Optional user ID for personalized view
    pub async fn get_table_state(
        &self,
        table_id: TableId,
        user_id: Option<UserId>,
    ) -> Result<TableStateResponse, TableError> {
        self.handle(table_id)
            .await?
            .request(|response| TableMessage::GetState { user_id, response })
            .await
    }

    /// Last summary the table published, without a round trip to its task
    pub async fn table_summary(&self, table_id: TableId) -> Result<TableSummary, TableError> {
        Ok(self.handle(table_id).await?.summary())
    }

    /// List all open tables, ordered by ID
    pub async fn list_tables(&self) -> Vec<TableSummary> {
        let tables = self.tables.read().await;
        let mut summaries: Vec<TableSummary> = tables
            .values()
            .filter(|handle| !handle.is_closed())
            .map(TableHandle::summary)
            .collect();
        drop(tables);

        summaries.sort_by_key(|summary| summary.id);
        summaries
    }

    /// Get active table count
    pub async fn active_table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.values().filter(|handle| !handle.is_closed()).count()
    }

    pub async fn stats(&self) -> ManagerStats {
        let mut stats = ManagerStats::default();
        for summary in self.list_tables().await {
            match summary.status {
                TableStatus::Waiting => stats.waiting += 1,
                TableStatus::Running => stats.running += 1,
                TableStatus::Finished => stats.finished += 1,
                TableStatus::Replay => stats.replays += 1,
                TableStatus::Closed => {}
            }
        }
        stats
    }

    /// Close a table
    pub async fn close_table(&self, table_id: TableId) -> Result<(), TableError> {
        let handle = self.handle(table_id).await?;
        match handle
            .request(|response| TableMessage::Close { response })
            .await
        {
            // Already stopped on its own.
            Ok(()) | Err(TableError::Closed) => {}
            Err(e) => return Err(e),
        }

        let mut tables = self.tables.write().await;
        tables.remove(&table_id);
        drop(tables);

        log::info!("Closed table {}", table_id);
        Ok(())
    }

    /// Forget tables whose actors stopped on their own, such as idle ones.
    /// Returns how many were removed.
    pub async fn prune_closed(&self) -> usize {
        let mut tables = self.tables.write().await;
        let before = tables.len();
        tables.retain(|_, handle| !handle.is_closed());
        let pruned = before - tables.len();
        drop(tables);

        if pruned > 0 {
            log::debug!("Pruned {} closed tables", pruned);
        }
        pruned
    }

    /// Close every table
    pub async fn shutdown(&self) {
        let ids: Vec<TableId> = self.tables.read().await.keys().copied().collect();
        for table_id in ids {
            if let Err(e) = self.close_table(table_id).await {
                log::warn!("Failed to close table {} during shutdown: {}", table_id, e);
            }
        }
        log::info!("All tables closed");
    }
}
