use thiserror::Error;

use super::TableId;
use crate::game::{GameError, ReplayError, SetupError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("table {0} not found")]
    NotFound(TableId),

    #[error("table is closed")]
    Closed,

    #[error("no game is running at this table")]
    NotApplicable,

    #[error(transparent)]
    Rejected(#[from] GameError),

    #[error("can't start the game: {0}")]
    Config(#[from] SetupError),

    #[error("can't rebuild the game: {0}")]
    Replay(#[from] ReplayError),

    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),

    #[error("subscriber can't take the backlog")]
    SubscriberUnavailable,

    #[error("table is full")]
    Full,

    #[error("game already in progress")]
    GameInProgress,

    #[error("already at this table")]
    AlreadyJoined,

    #[error("not at this table")]
    NotAtTable,

    #[error("only the table owner can do that")]
    NotOwner,

    #[error("need 2+ players")]
    NotEnoughPlayers,

    #[error("message is empty or longer than {0} characters")]
    InvalidInput(usize),
}
