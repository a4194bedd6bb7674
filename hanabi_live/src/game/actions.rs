//! Game events.
//!
//! Every state change a game makes is appended to its [`ActionLog`] as an
//! [`Action`]. The log is the replay source of truth and also what tables
//! broadcast to their subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Clue, Order, Rank, SeatIndex, Sound, SuitIndex};

/// Why a game ended.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EndCondition {
    /// Perfect score, or the final round after the deck ran out.
    Normal,
    Strikeout,
    TimeLimit,
    Idle,
}

impl fmt::Display for EndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Normal => "normal",
            Self::Strikeout => "strikeout",
            Self::TimeLimit => "time limit",
            Self::Idle => "idle",
        };
        write!(f, "{repr}")
    }
}

/// A card that left a hand (or the deck) for the stacks or the discard pile.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Which {
    /// Seat of the player the card belonged to.
    pub index: SeatIndex,
    pub suit: SuitIndex,
    pub rank: Rank,
    pub order: Order,
    /// -1 when the card came straight from the deck.
    pub slot: i32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    Clue {
        clue: Clue,
        giver: SeatIndex,
        target: SeatIndex,
        list: Vec<Order>,
        turn: u32,
    },
    /// Narration line shown in the game log.
    Text { text: String },
    Play { which: Which },
    Discard { which: Which, failed: bool },
    Strike { num: u8, order: Order },
    /// `suit` and `rank` are withheld from the drawing player.
    Draw {
        who: SeatIndex,
        order: Order,
        suit: Option<SuitIndex>,
        rank: Option<Rank>,
    },
    DrawSize { size: usize },
    Reorder {
        target: SeatIndex,
        hand_order: Vec<Order>,
    },
    Status {
        clues: i32,
        score: u32,
        max_score: u32,
        progress: u32,
    },
    Turn {
        num: u32,
        who: SeatIndex,
        sound: Option<Sound>,
    },
    GameOver {
        end_condition: EndCondition,
        score: u32,
    },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LoggedAction {
    pub seq: u64,
    /// Turn the action happened on.
    pub turn: u32,
    #[serde(flatten)]
    pub action: Action,
}

impl LoggedAction {
    /// The action as it should be shown to `seat`. Players never learn the
    /// identity of cards they draw; spectators (`None`) see everything.
    #[must_use]
    pub fn scrubbed_for(&self, seat: Option<SeatIndex>) -> Self {
        match &self.action {
            Action::Draw { who, order, .. } if Some(*who) == seat => Self {
                seq: self.seq,
                turn: self.turn,
                action: Action::Draw {
                    who: *who,
                    order: *order,
                    suit: None,
                    rank: None,
                },
            },
            _ => self.clone(),
        }
    }
}

/// Append-only record of a game. Entries are never removed or rewritten;
/// `delivered` only tracks how much of the log has been broadcast.
#[derive(Clone, Debug, Default)]
pub struct ActionLog {
    entries: Vec<LoggedAction>,
    delivered: usize,
}

impl ActionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: u32, action: Action) -> u64 {
        let seq = self.entries.len() as u64;
        self.entries.push(LoggedAction { seq, turn, action });
        seq
    }

    #[must_use]
    pub fn entries(&self) -> &[LoggedAction] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&LoggedAction> {
        self.entries.last()
    }

    /// Everything appended since the last call, in order.
    pub fn drain_new(&mut self) -> Vec<LoggedAction> {
        let fresh = self.entries[self.delivered..].to_vec();
        self.delivered = self.entries.len();
        fresh
    }

    /// Treat everything logged so far as delivered.
    pub fn mark_delivered(&mut self) {
        self.delivered = self.entries.len();
    }
}
