//! Table actor message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::{TableId, UserId, errors::TableError};
use crate::game::{CardIdentity, EndCondition, GameCommand, GameSummary, LoggedAction, Order};
use crate::history::GameRecord;

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Take a seat for the next game
    Join {
        user_id: UserId,
        username: String,
        response: oneshot::Sender<Result<(), TableError>>,
    },

    /// Leave the table. Seated players of a running game are only marked
    /// as disconnected.
    Leave {
        user_id: UserId,
        response: oneshot::Sender<Result<LeaveOutcome, TableError>>,
    },

    /// Watch the table without a seat
    Spectate {
        user_id: UserId,
        username: String,
        response: oneshot::Sender<Result<(), TableError>>,
    },

    /// Stop spectating
    StopSpectating {
        user_id: UserId,
        response: oneshot::Sender<Result<LeaveOutcome, TableError>>,
    },

    /// Deal and start the game (owner only)
    Start {
        user_id: UserId,
        response: oneshot::Sender<Result<(), TableError>>,
    },

    /// A game move
    Command {
        user_id: UserId,
        command: GameCommand,
        response: oneshot::Sender<Result<Vec<LoggedAction>, TableError>>,
    },

    /// Write a private note on a card
    SetNote {
        user_id: UserId,
        order: Order,
        note: String,
        response: oneshot::Sender<Result<(), TableError>>,
    },

    /// Send chat message
    Chat {
        user_id: UserId,
        message: String,
        response: oneshot::Sender<Result<(), TableError>>,
    },

    /// Get current table state as seen by a user (or a spectator for `None`)
    GetState {
        user_id: Option<UserId>,
        response: oneshot::Sender<TableStateResponse>,
    },

    /// Record of the finished game, if there is one
    GetRecord {
        response: oneshot::Sender<Option<GameRecord>>,
    },

    /// Subscribe to notifications. The first notification is always a backlog.
    Subscribe {
        session_id: Uuid,
        user_id: Option<UserId>,
        sender: mpsc::Sender<Notification>,
        response: oneshot::Sender<Result<(), TableError>>,
    },

    /// Unsubscribe from notifications
    Unsubscribe { session_id: Uuid },

    /// Close table
    Close { response: oneshot::Sender<()> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveOutcome {
    /// Nobody is left at the table
    pub table_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Pushed to subscribers as the table changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Notification {
    /// Everything that happened before the subscription, or the whole deal
    /// when a game starts
    Backlog {
        actions: Vec<LoggedAction>,
        chat: Vec<ChatMessage>,
    },
    Action(LoggedAction),
    Chat(ChatMessage),
    /// Seats, spectators or status changed
    Roster(TableSummary),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Waiting,
    Running,
    Finished,
    Replay,
    Closed,
}

/// Cheap read-only summary, published on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub id: TableId,
    pub name: String,
    pub owner: UserId,
    pub variant: String,
    pub status: TableStatus,
    pub players: Vec<String>,
    pub spectator_count: usize,
    pub max_players: usize,
    pub turn: Option<u32>,
    pub score: Option<u32>,
    pub end_condition: Option<EndCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub order: Order,
    /// Hidden for the viewer's own hand
    pub identity: Option<CardIdentity>,
    pub touched: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandView {
    pub name: String,
    pub disconnected: bool,
    pub cards: Vec<CardView>,
}

/// Table state response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStateResponse {
    pub summary: TableSummary,
    pub game: Option<GameSummary>,
    pub hands: Vec<HandView>,
}
