//! Table actor implementation with async message handling.
//!
//! Each table runs as its own task and is the only writer of its state.
//! Messages are processed strictly one at a time, so a command either applies
//! completely or is rejected before anything changes. Timers (idle timeout,
//! player clocks) are handled in the same loop and can't race with commands.

use super::{
    TableId, UserId,
    config::{ManagerConfig, TableConfig},
    errors::TableError,
    messages::{
        CardView, ChatMessage, HandView, LeaveOutcome, Notification, TableMessage,
        TableStateResponse, TableStatus, TableSummary,
    },
};
use crate::{
    game::{
        EndCondition, Game, GameCommand, GameError, GameSetup, GameStatus, LoggedAction, Order,
        SeatIndex,
        constants::{MAX_USER_INPUT_LENGTH, MIN_PLAYERS},
        replay,
    },
    history::{GameRecord, GameRecorder, persist_finished_game},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{Instant, sleep_until},
};
use uuid::Uuid;

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
    summary: watch::Receiver<TableSummary>,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(
        sender: mpsc::Sender<TableMessage>,
        table_id: TableId,
        summary: watch::Receiver<TableSummary>,
    ) -> Self {
        Self {
            sender,
            table_id,
            summary,
        }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Latest published summary. Never waits on the table.
    pub fn summary(&self) -> TableSummary {
        self.summary.borrow().clone()
    }

    /// The actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed)
    }

    /// Send a message that carries a response channel and wait for the answer
    pub async fn request<T, F>(&self, build: F) -> Result<T, TableError>
    where
        F: FnOnce(oneshot::Sender<T>) -> TableMessage,
    {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| TableError::Closed)
    }
}

#[derive(Debug, Clone)]
struct Seat {
    user_id: UserId,
    username: String,
    disconnected: bool,
}

#[derive(Debug)]
struct Subscriber {
    user_id: Option<UserId>,
    sender: mpsc::Sender<Notification>,
}

/// Table actor managing a single game table
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// User that created the table and may start the game
    owner: UserId,

    /// Players in seat order
    seats: Vec<Seat>,

    spectators: HashMap<UserId, String>,

    /// Current game, kept after it finishes
    game: Option<Game>,

    started_at: Option<DateTime<Utc>>,

    /// Record of the finished game
    record: Option<GameRecord>,

    /// Read-only table showing a rebuilt game
    is_replay: bool,

    chat: Vec<ChatMessage>,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Subscribers keyed by session
    subscribers: HashMap<Uuid, Subscriber>,

    summary_tx: watch::Sender<TableSummary>,

    recorder: Arc<dyn GameRecorder>,

    manager_config: ManagerConfig,

    last_activity: Instant,

    /// When the active player's turn began
    turn_started: Instant,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor
    pub fn new(
        id: TableId,
        config: TableConfig,
        owner: UserId,
        recorder: Arc<dyn GameRecorder>,
        manager_config: ManagerConfig,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(manager_config.inbox_capacity);
        let now = Instant::now();
        let initial = TableSummary {
            id,
            name: config.name.clone(),
            owner,
            variant: config.options.variant.clone(),
            status: TableStatus::Waiting,
            players: Vec::new(),
            spectator_count: 0,
            max_players: config.max_players,
            turn: None,
            score: None,
            end_condition: None,
        };
        let (summary_tx, summary_rx) = watch::channel(initial);

        let actor = Self {
            id,
            config,
            owner,
            seats: Vec::new(),
            spectators: HashMap::new(),
            game: None,
            started_at: None,
            record: None,
            is_replay: false,
            chat: Vec::new(),
            inbox,
            subscribers: HashMap::new(),
            summary_tx,
            recorder,
            manager_config,
            last_activity: now,
            turn_started: now,
            is_closed: false,
        };
        actor.publish_summary();

        let handle = TableHandle::new(sender, id, summary_rx);
        (actor, handle)
    }

    /// Create a read-only table that shows a finished game rebuilt from its
    /// record.
    ///
    /// # Errors
    ///
    /// Fails if the record's log doesn't replay against its deck.
    pub fn replay_of(
        id: TableId,
        record: &GameRecord,
        owner: UserId,
        recorder: Arc<dyn GameRecorder>,
        manager_config: ManagerConfig,
    ) -> Result<(Self, TableHandle), TableError> {
        let game = replay(record.setup.clone(), &record.initial_deck, &record.actions)?;
        let config = TableConfig {
            name: format!("{} (replay)", record.table_name),
            max_players: record.players.len(),
            options: record.setup.options.clone(),
            seed: Some(record.setup.seed),
        };

        let (mut actor, handle) = Self::new(id, config, owner, recorder, manager_config);
        actor.is_replay = true;
        actor.started_at = Some(record.started_at);
        actor.game = Some(game);
        if let Some(game) = actor.game.as_mut() {
            game.data.actions.mark_delivered();
        }
        actor.record = Some(record.clone());
        actor.publish_summary();
        Ok((actor, handle))
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Table {} '{}' starting", self.id, self.config.name);

        while !self.is_closed {
            let idle_deadline = self.last_activity + self.manager_config.idle_timeout;
            let clock_deadline = self.clock_deadline();

            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => {
                        if counts_as_activity(&message) {
                            self.last_activity = Instant::now();
                        }
                        self.handle_message(message).await;
                    }
                    None => break,
                },

                _ = sleep_until(idle_deadline) => self.handle_idle().await,

                _ = sleep_until(clock_deadline.unwrap_or(idle_deadline)), if clock_deadline.is_some() => {
                    self.handle_clock_expired().await;
                }
            }
        }

        self.is_closed = true;
        self.notify(|_| Notification::Closed);
        self.publish_summary();
        log::info!("Table {} '{}' closed", self.id, self.config.name);
    }

    /// Handle a table message
    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join {
                user_id,
                username,
                response,
            } => {
                let result = self.handle_join(user_id, username);
                let _ = response.send(result);
            }

            TableMessage::Leave { user_id, response } => {
                let result = self.handle_leave(user_id);
                let _ = response.send(result);
            }

            TableMessage::Spectate {
                user_id,
                username,
                response,
            } => {
                let result = self.handle_spectate(user_id, username);
                let _ = response.send(result);
            }

            TableMessage::StopSpectating { user_id, response } => {
                let result = self.handle_stop_spectating(user_id);
                let _ = response.send(result);
            }

            TableMessage::Start { user_id, response } => {
                let result = self.handle_start(user_id);
                let _ = response.send(result);
            }

            TableMessage::Command {
                user_id,
                command,
                response,
            } => {
                let result = self.handle_command(user_id, command).await;
                let _ = response.send(result);
            }

            TableMessage::SetNote {
                user_id,
                order,
                note,
                response,
            } => {
                let result = self.handle_set_note(user_id, order, note);
                let _ = response.send(result);
            }

            TableMessage::Chat {
                user_id,
                message,
                response,
            } => {
                let result = self.handle_chat(user_id, message);
                let _ = response.send(result);
            }

            TableMessage::GetState { user_id, response } => {
                let _ = response.send(self.get_state(user_id));
            }

            TableMessage::GetRecord { response } => {
                let _ = response.send(self.record.clone());
            }

            TableMessage::Subscribe {
                session_id,
                user_id,
                sender,
                response,
            } => {
                let result = self.handle_subscribe(session_id, user_id, sender);
                let _ = response.send(result);
            }

            TableMessage::Unsubscribe { session_id } => {
                self.subscribers.remove(&session_id);
                log::debug!(
                    "Session {} unsubscribed from table {}",
                    session_id,
                    self.id
                );
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    fn seat_of(&self, user_id: UserId) -> Option<SeatIndex> {
        self.seats.iter().position(|s| s.user_id == user_id)
    }

    fn game_running(&self) -> bool {
        self.game
            .as_ref()
            .is_some_and(|g| g.status() == GameStatus::Running)
    }

    /// Handle join table request
    fn handle_join(&mut self, user_id: UserId, username: String) -> Result<(), TableError> {
        if let Some(seat) = self.seat_of(user_id) {
            // Seated players of a running game can come back.
            if self.seats[seat].disconnected {
                self.seats[seat].disconnected = false;
                log::info!("User {} rejoined table {}", user_id, self.id);
                self.roster_changed();
                return Ok(());
            }
            return Err(TableError::AlreadyJoined);
        }
        if self.game.is_some() || self.is_replay {
            return Err(TableError::GameInProgress);
        }
        if self.seats.len() >= self.config.max_players {
            return Err(TableError::Full);
        }
        let username = username.trim().to_string();
        if username.is_empty() || username.len() > MAX_USER_INPUT_LENGTH {
            return Err(TableError::InvalidInput(MAX_USER_INPUT_LENGTH));
        }

        self.spectators.remove(&user_id);
        self.seats.push(Seat {
            user_id,
            username: username.clone(),
            disconnected: false,
        });
        log::info!("User {} ({}) joined table {}", user_id, username, self.id);
        self.roster_changed();
        Ok(())
    }

    /// Handle leave table request
    fn handle_leave(&mut self, user_id: UserId) -> Result<LeaveOutcome, TableError> {
        match self.seat_of(user_id) {
            Some(seat) if self.game_running() => {
                self.seats[seat].disconnected = true;
                log::info!("User {} disconnected from table {}", user_id, self.id);
            }
            Some(seat) if self.game.is_none() => {
                self.seats.remove(seat);
                log::info!("User {} left table {}", user_id, self.id);
            }
            // After the game the seats are part of the record.
            Some(seat) => self.seats[seat].disconnected = true,
            None => {
                if self.spectators.remove(&user_id).is_none() {
                    return Err(TableError::NotAtTable);
                }
            }
        }
        self.roster_changed();
        Ok(self.leave_outcome())
    }

    fn leave_outcome(&self) -> LeaveOutcome {
        LeaveOutcome {
            table_empty: self.spectators.is_empty() && self.seats.iter().all(|s| s.disconnected),
        }
    }

    fn handle_spectate(&mut self, user_id: UserId, username: String) -> Result<(), TableError> {
        if self.seat_of(user_id).is_some() || self.spectators.contains_key(&user_id) {
            return Err(TableError::AlreadyJoined);
        }
        self.spectators.insert(user_id, username);
        self.roster_changed();
        Ok(())
    }

    fn handle_stop_spectating(&mut self, user_id: UserId) -> Result<LeaveOutcome, TableError> {
        if self.spectators.remove(&user_id).is_none() {
            return Err(TableError::NotAtTable);
        }
        self.roster_changed();
        Ok(self.leave_outcome())
    }

    /// Deal the game and hand every subscriber the opening backlog
    fn handle_start(&mut self, user_id: UserId) -> Result<(), TableError> {
        if user_id != self.owner {
            return Err(TableError::NotOwner);
        }
        if self.game.is_some() || self.is_replay {
            return Err(TableError::GameInProgress);
        }
        if self.seats.len() < MIN_PLAYERS {
            return Err(TableError::NotEnoughPlayers);
        }

        let setup = GameSetup {
            options: self.config.options.clone(),
            player_names: self.seats.iter().map(|s| s.username.clone()).collect(),
            seed: self.config.seed.unwrap_or_else(rand::random),
        };
        let mut game = Game::new(setup)?;
        game.data.actions.mark_delivered();
        self.game = Some(game);
        self.started_at = Some(Utc::now());
        self.turn_started = Instant::now();

        log::info!(
            "Table {} started a {} game with {} players",
            self.id,
            self.config.options.variant,
            self.seats.len()
        );

        let chat = self.chat.clone();
        let actions = self.full_log();
        self.notify(|seat| Notification::Backlog {
            actions: scrub_all(&actions, seat),
            chat: chat.clone(),
        });
        self.roster_changed();
        Ok(())
    }

    /// Handle a game move
    async fn handle_command(
        &mut self,
        user_id: UserId,
        command: GameCommand,
    ) -> Result<Vec<LoggedAction>, TableError> {
        if self.is_replay || !self.game_running() {
            return Err(TableError::NotApplicable);
        }
        let seat = self.seat_of(user_id).ok_or(TableError::NotAtTable)?;

        // The clock timer and this command can arrive in the same instant.
        let now = Instant::now();
        if self
            .clock_deadline()
            .is_some_and(|deadline| now >= deadline)
        {
            self.handle_clock_expired().await;
            if !self.game_running() {
                return Err(GameError::GameOver.into());
            }
        }

        let Some(game) = self.game.as_mut() else {
            return Err(TableError::NotApplicable);
        };
        let outcome = game.apply(seat, command)?;
        game.charge_clock(seat, now.duration_since(self.turn_started));
        self.turn_started = now;

        if outcome.double_discard {
            log::debug!("Table {}: double discard on turn {}", self.id, game.data.turn);
        }

        let fresh = self.broadcast_new_actions();
        if outcome.finished {
            self.finish_game().await;
        }
        self.publish_summary();
        Ok(scrub_all(&fresh, Some(seat)))
    }

    fn handle_set_note(
        &mut self,
        user_id: UserId,
        order: Order,
        note: String,
    ) -> Result<(), TableError> {
        if note.len() > MAX_USER_INPUT_LENGTH {
            return Err(TableError::InvalidInput(MAX_USER_INPUT_LENGTH));
        }
        let seat = self.seat_of(user_id).ok_or(TableError::NotAtTable)?;
        let game = self.game.as_mut().ok_or(TableError::NotApplicable)?;
        game.data.card(order)?;
        game.players[seat].set_note(order, note);
        Ok(())
    }

    fn handle_chat(&mut self, user_id: UserId, message: String) -> Result<(), TableError> {
        let username = match self.seat_of(user_id) {
            Some(seat) => self.seats[seat].username.clone(),
            None => self
                .spectators
                .get(&user_id)
                .cloned()
                .ok_or(TableError::NotAtTable)?,
        };
        let message = message.trim().to_string();
        if message.is_empty() || message.len() > MAX_USER_INPUT_LENGTH {
            return Err(TableError::InvalidInput(MAX_USER_INPUT_LENGTH));
        }

        let chat = ChatMessage {
            user_id,
            username,
            message,
            timestamp: Utc::now(),
        };
        self.chat.push(chat.clone());
        self.notify(|_| Notification::Chat(chat.clone()));
        Ok(())
    }

    fn handle_subscribe(
        &mut self,
        session_id: Uuid,
        user_id: Option<UserId>,
        sender: mpsc::Sender<Notification>,
    ) -> Result<(), TableError> {
        let seat = self.viewer_seat(user_id);
        let backlog = Notification::Backlog {
            actions: scrub_all(&self.full_log(), seat),
            chat: self.chat.clone(),
        };
        if sender.try_send(backlog).is_err() {
            log::warn!(
                "Session {} couldn't take the backlog of table {}",
                session_id,
                self.id
            );
            return Err(TableError::SubscriberUnavailable);
        }
        let _ = sender.try_send(Notification::Roster(self.summary()));
        self.subscribers
            .insert(session_id, Subscriber { user_id, sender });
        log::debug!("Session {} subscribed to table {}", session_id, self.id);
        Ok(())
    }

    /// Get current table state as seen by a user
    fn get_state(&self, user_id: Option<UserId>) -> TableStateResponse {
        let viewer = self.viewer_seat(user_id);
        let hands = match &self.game {
            Some(game) => {
                let hide_own = game.status() == GameStatus::Running;
                game.players
                    .iter()
                    .map(|player| HandView {
                        name: player.name.clone(),
                        disconnected: self
                            .seats
                            .get(player.index)
                            .is_some_and(|s| s.disconnected),
                        cards: player
                            .hand
                            .iter()
                            .filter_map(|order| game.data.deck.get(*order))
                            .map(|card| CardView {
                                order: card.order,
                                identity: if hide_own && viewer == Some(player.index) {
                                    None
                                } else {
                                    Some(card.identity)
                                },
                                touched: card.touched,
                                note: viewer
                                    .and_then(|seat| game.players[seat].notes.get(&card.order))
                                    .cloned(),
                            })
                            .collect(),
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        TableStateResponse {
            summary: self.summary(),
            game: self.game.as_ref().map(Game::summary),
            hands,
        }
    }

    /// Seat whose draws are hidden from this viewer
    fn viewer_seat(&self, user_id: Option<UserId>) -> Option<SeatIndex> {
        if self.is_replay || self.game.is_none() {
            return None;
        }
        user_id.and_then(|u| self.seat_of(u))
    }

    fn full_log(&self) -> Vec<LoggedAction> {
        self.game
            .as_ref()
            .map(|g| g.data.actions.entries().to_vec())
            .unwrap_or_default()
    }

    fn clock_deadline(&self) -> Option<Instant> {
        if self.is_replay {
            return None;
        }
        self.game
            .as_ref()
            .and_then(Game::active_clock)
            .map(|left| self.turn_started + left)
    }

    /// Nothing happened for too long: end the game and close the table
    async fn handle_idle(&mut self) {
        log::info!(
            "Table {} idle for {:?}, closing",
            self.id,
            self.manager_config.idle_timeout
        );
        self.terminate_game(EndCondition::Idle).await;
        self.is_closed = true;
    }

    async fn handle_clock_expired(&mut self) {
        let elapsed = self.turn_started.elapsed();
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let seat = game.active_player();
        if !game.charge_clock(seat, elapsed) {
            log::info!("Table {}: seat {} ran out of time", self.id, seat);
            self.terminate_game(EndCondition::TimeLimit).await;
        }
        self.turn_started = Instant::now();
    }

    /// Inject a synthetic end through the same path as player commands
    async fn terminate_game(&mut self, condition: EndCondition) {
        if self.is_replay || !self.game_running() {
            return;
        }
        if let Some(game) = self.game.as_mut() {
            if let Err(e) = game.terminate(condition) {
                log::error!("Table {}: couldn't end the game: {}", self.id, e);
                return;
            }
        }
        self.broadcast_new_actions();
        self.finish_game().await;
        self.publish_summary();
    }

    /// Build the game record and hand it to the recorder
    async fn finish_game(&mut self) {
        if self.record.is_some() {
            return;
        }
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let user_ids: Vec<UserId> = self.seats.iter().map(|s| s.user_id).collect();
        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let Some(record) =
            GameRecord::from_game(self.id, &self.config.name, &user_ids, game, started_at)
        else {
            return;
        };

        match persist_finished_game(self.recorder.as_ref(), record.clone()).await {
            Ok(deltas) => {
                let mut record = record;
                record.best_score_deltas = deltas;
                self.record = Some(record);
            }
            Err(e) => {
                log::error!("Table {}: failed to record game {}: {}", self.id, record.id, e);
                self.record = Some(record);
            }
        }
        self.roster_changed();
    }

    /// Send everything the game logged since the last broadcast
    fn broadcast_new_actions(&mut self) -> Vec<LoggedAction> {
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let fresh = game.data.actions.drain_new();
        for action in &fresh {
            self.notify(|seat| Notification::Action(action.scrubbed_for(seat)));
        }
        fresh
    }

    fn roster_changed(&mut self) {
        self.publish_summary();
        let summary = self.summary();
        self.notify(|_| Notification::Roster(summary.clone()));
    }

    /// Broadcast a notification to all subscribers. `build` gets the seat
    /// of the subscriber, if they play in the current game.
    fn notify<F>(&mut self, build: F)
    where
        F: Fn(Option<SeatIndex>) -> Notification,
    {
        let table_id = self.id;
        let hides_draws = !self.is_replay && self.game.is_some();
        let seats = &self.seats;
        self.subscribers.retain(|session_id, subscriber| {
            let seat = subscriber
                .user_id
                .filter(|_| hides_draws)
                .and_then(|u| seats.iter().position(|s| s.user_id == u));
            match subscriber.sender.try_send(build(seat)) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Table {}: session {} channel full, dropping notification",
                        table_id,
                        session_id
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!(
                        "Table {}: session {} disconnected, removing",
                        table_id,
                        session_id
                    );
                    false
                }
            }
        });
    }

    fn summary(&self) -> TableSummary {
        let status = if self.is_closed {
            TableStatus::Closed
        } else if self.is_replay {
            TableStatus::Replay
        } else {
            match self.game.as_ref().map(Game::status) {
                None | Some(GameStatus::Dealing) => TableStatus::Waiting,
                Some(GameStatus::Running) => TableStatus::Running,
                Some(GameStatus::Finished(_)) => TableStatus::Finished,
            }
        };
        let players = match (&self.game, self.is_replay) {
            (Some(game), true) => game.players.iter().map(|p| p.name.clone()).collect(),
            _ => self.seats.iter().map(|s| s.username.clone()).collect(),
        };
        let end_condition = match self.game.as_ref().map(Game::status) {
            Some(GameStatus::Finished(condition)) => Some(condition),
            _ => None,
        };

        TableSummary {
            id: self.id,
            name: self.config.name.clone(),
            owner: self.owner,
            variant: self.config.options.variant.clone(),
            status,
            players,
            spectator_count: self.spectators.len(),
            max_players: self.config.max_players,
            turn: self.game.as_ref().map(|g| g.data.turn),
            score: self.game.as_ref().map(|g| g.data.score),
            end_condition,
        }
    }

    fn publish_summary(&self) {
        self.summary_tx.send_replace(self.summary());
    }
}

fn scrub_all(actions: &[LoggedAction], seat: Option<SeatIndex>) -> Vec<LoggedAction> {
    actions.iter().map(|a| a.scrubbed_for(seat)).collect()
}

/// Queries don't keep a table alive
fn counts_as_activity(message: &TableMessage) -> bool {
    !matches!(
        message,
        TableMessage::GetState { .. }
            | TableMessage::GetRecord { .. }
            | TableMessage::Subscribe { .. }
            | TableMessage::Unsubscribe { .. }
    )
}
