//! Finished-game records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{
    CardIdentity, Character, EndCondition, Game, GameOptions, GameSetup, GameStatus, LoggedAction,
};
use crate::table::{TableId, UserId};

/// Options that make a score easier to reach. A best score set with fewer
/// modifiers beats an equal score set with more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreModifier(pub u8);

impl ScoreModifier {
    pub const NONE: Self = Self(0);
    pub const DECK_PLAYS: Self = Self(1);
    pub const EMPTY_CLUES: Self = Self(1 << 1);

    #[must_use]
    pub fn from_options(options: &GameOptions) -> Self {
        let mut bits = 0;
        if options.deck_plays {
            bits |= Self::DECK_PLAYS.0;
        }
        if options.empty_clues {
            bits |= Self::EMPTY_CLUES.0;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestScore {
    pub score: u32,
    pub modifier: ScoreModifier,
}

impl BestScore {
    #[must_use]
    pub fn is_better_than(&self, other: &BestScore) -> bool {
        self.score > other.score || (self.score == other.score && self.modifier.0 < other.modifier.0)
    }
}

/// A player's best score for this variant and player count moved up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestScoreDelta {
    pub user_id: UserId,
    pub previous: Option<BestScore>,
    pub current: BestScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: UserId,
    pub name: String,
    pub seat: usize,
    pub character: Option<Character>,
}

/// Everything persistence needs to know about a finished game, including
/// what it takes to replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: Uuid,
    pub table_id: TableId,
    pub table_name: String,
    pub variant: String,
    pub players: Vec<PlayerRecord>,
    pub score: u32,
    pub end_condition: EndCondition,
    pub modifier: ScoreModifier,
    pub turns: u32,
    pub num_number_clues: usize,
    pub num_color_clues: usize,
    pub setup: GameSetup,
    pub initial_deck: Vec<CardIdentity>,
    pub actions: Vec<LoggedAction>,
    pub best_score_deltas: Vec<BestScoreDelta>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl GameRecord {
    /// Build the record of a finished game. Returns `None` while the game is
    /// still running.
    #[must_use]
    pub fn from_game(
        table_id: TableId,
        table_name: &str,
        user_ids: &[UserId],
        game: &Game,
        started_at: DateTime<Utc>,
    ) -> Option<Self> {
        let end_condition = match game.status() {
            GameStatus::Finished(condition) => condition,
            _ => return None,
        };
        let players = game
            .players
            .iter()
            .zip(user_ids)
            .map(|(player, user_id)| PlayerRecord {
                user_id: *user_id,
                name: player.name.clone(),
                seat: player.index,
                character: player.character,
            })
            .collect();
        let (num_number_clues, num_color_clues) = game.clue_counts();

        Some(Self {
            id: Uuid::new_v4(),
            table_id,
            table_name: table_name.to_string(),
            variant: game.data.variant.name.clone(),
            players,
            score: game.data.score,
            end_condition,
            modifier: ScoreModifier::from_options(&game.data.options),
            turns: game.data.turn,
            num_number_clues,
            num_color_clues,
            setup: game.setup().clone(),
            initial_deck: game.initial_deck().to_vec(),
            actions: game.data.actions.entries().to_vec(),
            best_score_deltas: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn best_score(&self) -> BestScore {
        BestScore {
            score: self.score,
            modifier: self.modifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_score_is_better() {
        let low = BestScore {
            score: 20,
            modifier: ScoreModifier::NONE,
        };
        let high = BestScore {
            score: 22,
            modifier: ScoreModifier::DECK_PLAYS,
        };
        assert!(high.is_better_than(&low));
        assert!(!low.is_better_than(&high));
    }

    #[test]
    fn test_fewer_modifiers_break_ties() {
        let plain = BestScore {
            score: 25,
            modifier: ScoreModifier::NONE,
        };
        let assisted = BestScore {
            score: 25,
            modifier: ScoreModifier::EMPTY_CLUES,
        };
        assert!(plain.is_better_than(&assisted));
        assert!(!assisted.is_better_than(&plain));
        assert!(!plain.is_better_than(&plain));
    }

    #[test]
    fn test_modifier_from_options() {
        let mut options = GameOptions::default();
        assert_eq!(ScoreModifier::from_options(&options), ScoreModifier::NONE);
        options.deck_plays = true;
        options.empty_clues = true;
        let modifier = ScoreModifier::from_options(&options);
        assert!(modifier.contains(ScoreModifier::DECK_PLAYS));
        assert!(modifier.contains(ScoreModifier::EMPTY_CLUES));
    }
}
