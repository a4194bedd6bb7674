//! Character abilities.
//!
//! When a table enables character assignments, each seat is handed a
//! character at the start of the game. Characters restrict what a player may
//! do or add side effects to their actions. The hooks below are the only
//! places the rest of the engine asks about characters.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{CardIdentity, Clue, ClueKind};
use super::player::Player;
use super::state_machine::{GameData, GameError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Character {
    /// Can't give two clues of the same type in a row.
    MoodSwings,
    /// Can't play a card unless two cards of that rank are already played.
    Follower,
    /// Turn order inverts after each of their turns; the end game lasts two turns.
    Contrarian,
    /// Shuffles their own hand after giving a clue.
    Forgetful,
}

impl Character {
    pub const ALL: [Character; 4] = [
        Character::MoodSwings,
        Character::Follower,
        Character::Contrarian,
        Character::Forgetful,
    ];
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::MoodSwings => "Mood Swings",
            Self::Follower => "Follower",
            Self::Contrarian => "Contrarian",
            Self::Forgetful => "Forgetful",
        };
        write!(f, "{repr}")
    }
}

/// No clue type has been given yet.
pub(crate) const NO_METADATA: i32 = -1;

fn clue_kind_code(kind: ClueKind) -> i32 {
    match kind {
        ClueKind::Number => 0,
        ClueKind::Color => 1,
    }
}

/// Reject clues a giver's character doesn't allow.
pub(crate) fn validate_clue(giver: &Player, clue: &Clue) -> Result<(), GameError> {
    if giver.character == Some(Character::MoodSwings)
        && giver.character_metadata == clue_kind_code(clue.kind)
    {
        return Err(GameError::CharacterRestriction {
            character: Character::MoodSwings,
            reason: format!("give two {} clues in a row", clue.kind),
        });
    }
    Ok(())
}

/// Runs once a clue has been applied and logged.
pub(crate) fn post_clue(giver: &mut Player, clue: &Clue, data: &mut GameData) {
    match giver.character {
        Some(Character::MoodSwings) => giver.character_metadata = clue_kind_code(clue.kind),
        Some(Character::Forgetful) => giver.shuffle_hand(data),
        _ => {}
    }
}

/// Whether a play must fail regardless of the stacks.
pub(crate) fn forces_misplay(player: &Player, data: &GameData, identity: CardIdentity) -> bool {
    player.character == Some(Character::Follower)
        && data.deck.num_played_of_rank(identity.rank) < 2
}

/// Runs when the last card is drawn and `end_turn` has just been set.
pub(crate) fn adjust_end_turn(data: &mut GameData) {
    if data.characters.contains(&Some(Character::Contrarian)) {
        data.end_turn = Some(data.turn + 2);
    }
}

/// Whether play direction flips after this player's turn.
pub(crate) fn inverts_turn_order(player: &Player) -> bool {
    player.character == Some(Character::Contrarian)
}
