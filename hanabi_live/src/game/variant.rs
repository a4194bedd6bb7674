//! Variant rule sets.
//!
//! A variant is resolved from its name exactly once, when a game is created.
//! Everything else asks the resulting [`Variant`] descriptor: which cards a
//! clue touches, how a stack may be built, what a clue costs and where the
//! clue and score ceilings are.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{MAX_CLUES, MAX_RANK, START_CARD_RANK, START_STACK};
use super::entities::{CardIdentity, Clue, ClueKind, Rank, SuitIndex};

pub const DEFAULT_VARIANT: &str = "No Variant";

const BASE_SUITS: [&str; 6] = ["Red", "Yellow", "Green", "Blue", "Purple", "Teal"];

#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum VariantError {
    #[error("unknown variant \"{0}\"")]
    Unknown(String),
}

/// Direction a stack is being built in. Normal variants start every stack
/// going up; Up or Down stacks stay undecided until the first real card lands.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackDirection {
    Undecided,
    Up,
    Down,
    Finished,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SuitDef {
    pub name: String,
    /// Indices of the clue colors that touch this suit.
    pub clue_colors: Vec<u8>,
    /// Touched by every color clue (rainbow).
    pub all_clue_colors: bool,
    /// Touched by no color clue (white).
    pub no_clue_colors: bool,
    /// Only a single copy of each rank (black).
    pub one_of_each: bool,
}

impl SuitDef {
    fn plain(name: &str, color: u8) -> Self {
        Self {
            name: name.to_string(),
            clue_colors: vec![color],
            all_clue_colors: false,
            no_clue_colors: false,
            one_of_each: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Family {
    Standard,
    Rainbow,
    White,
    Black,
    ColorBlind,
    UpOrDown,
    ClueStarved,
}

impl Family {
    fn from_prefix(prefix: &str) -> Option<Self> {
        let family = match prefix {
            "Rainbow" => Self::Rainbow,
            "White" => Self::White,
            "Black" => Self::Black,
            "Color Blind" => Self::ColorBlind,
            "Up or Down" => Self::UpOrDown,
            "Clue Starved" => Self::ClueStarved,
            _ => return None,
        };
        Some(family)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Variant {
    pub name: String,
    pub suits: Vec<SuitDef>,
    pub clue_colors: Vec<String>,
    /// Stacks may be built 1→5, 5→1, or from a START card in either direction.
    pub up_or_down: bool,
    /// Clue tokens are kept in halves: a clue costs two, a discard earns one.
    pub clue_starved: bool,
    /// Color clues touch nothing, so an empty color clue is legal.
    pub color_blind: bool,
}

impl Default for Variant {
    fn default() -> Self {
        Self::build(DEFAULT_VARIANT, Family::Standard, 5)
    }
}

impl Variant {
    /// Resolve a variant by name.
    ///
    /// # Errors
    ///
    /// Returns [`VariantError::Unknown`] for names that don't describe a
    /// supported variant.
    pub fn from_name(name: &str) -> Result<Self, VariantError> {
        let unknown = || VariantError::Unknown(name.to_string());
        let (family, num_suits) = match name {
            "No Variant" => (Family::Standard, 5),
            "Six Suits" => (Family::Standard, 6),
            "Four Suits" => (Family::Standard, 4),
            "Three Suits" => (Family::Standard, 3),
            _ => {
                let (prefix, rest) = name.split_once(" (").ok_or_else(unknown)?;
                let num_suits: usize = rest
                    .strip_suffix(" Suits)")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(unknown)?;
                if !(3..=6).contains(&num_suits) {
                    return Err(unknown());
                }
                (Family::from_prefix(prefix).ok_or_else(unknown)?, num_suits)
            }
        };
        Ok(Self::build(name, family, num_suits))
    }

    fn build(name: &str, family: Family, num_suits: usize) -> Self {
        let special = matches!(family, Family::Rainbow | Family::White | Family::Black);
        let num_plain = if special { num_suits - 1 } else { num_suits };

        let mut suits: Vec<SuitDef> = BASE_SUITS[..num_plain]
            .iter()
            .zip(0u8..)
            .map(|(name, color)| SuitDef::plain(name, color))
            .collect();
        let mut clue_colors: Vec<String> =
            BASE_SUITS[..num_plain].iter().map(|s| s.to_string()).collect();

        match family {
            Family::Rainbow => suits.push(SuitDef {
                name: "Rainbow".to_string(),
                clue_colors: vec![],
                all_clue_colors: true,
                no_clue_colors: false,
                one_of_each: false,
            }),
            Family::White => suits.push(SuitDef {
                name: "White".to_string(),
                clue_colors: vec![],
                all_clue_colors: false,
                no_clue_colors: true,
                one_of_each: false,
            }),
            Family::Black => {
                let mut black = SuitDef::plain("Black", num_plain as u8);
                black.one_of_each = true;
                suits.push(black);
                clue_colors.push("Black".to_string());
            }
            _ => {}
        }

        Self {
            name: name.to_string(),
            suits,
            clue_colors,
            up_or_down: family == Family::UpOrDown,
            clue_starved: family == Family::ClueStarved,
            color_blind: family == Family::ColorBlind,
        }
    }

    #[must_use]
    pub fn num_suits(&self) -> usize {
        self.suits.len()
    }

    /// How many copies of a card the deck holds.
    #[must_use]
    pub fn copies(&self, identity: CardIdentity) -> usize {
        let Some(suit) = self.suits.get(usize::from(identity.suit)) else {
            return 0;
        };
        if identity.is_start() {
            return usize::from(self.up_or_down);
        }
        if suit.one_of_each {
            return 1;
        }
        match identity.rank {
            1 if self.up_or_down => 1,
            1 => 3,
            2..=4 => 2,
            MAX_RANK => 1,
            _ => 0,
        }
    }

    /// Every card of the deck, unshuffled.
    #[must_use]
    pub fn deck_identities(&self) -> Vec<CardIdentity> {
        let first_rank = if self.up_or_down { START_CARD_RANK } else { 1 };
        let mut identities = Vec::new();
        for suit in 0..self.suits.len() as SuitIndex {
            for rank in first_rank..=MAX_RANK {
                let identity = CardIdentity::new(suit, rank);
                identities.extend(std::iter::repeat_n(identity, self.copies(identity)));
            }
        }
        identities
    }

    #[must_use]
    pub fn is_valid_clue(&self, clue: &Clue) -> bool {
        match clue.kind {
            ClueKind::Number => (1..=MAX_RANK).contains(&clue.value),
            ClueKind::Color => usize::from(clue.value) < self.clue_colors.len(),
        }
    }

    /// Whether a clue marks the given card.
    #[must_use]
    pub fn touches(&self, clue: &Clue, identity: CardIdentity) -> bool {
        let Some(suit) = self.suits.get(usize::from(identity.suit)) else {
            return false;
        };
        match clue.kind {
            // START cards have no number on them.
            ClueKind::Number => !identity.is_start() && identity.rank == clue.value,
            ClueKind::Color => {
                if self.color_blind || suit.no_clue_colors {
                    false
                } else {
                    suit.all_clue_colors || suit.clue_colors.contains(&clue.value)
                }
            }
        }
    }

    /// Clues that may legally touch nothing, whatever the table options say.
    #[must_use]
    pub fn allows_empty_clue(&self, clue: &Clue) -> bool {
        self.color_blind && clue.kind == ClueKind::Color
    }

    /// Clue tokens spent per clue.
    #[must_use]
    pub const fn clue_cost(&self) -> i32 {
        if self.clue_starved { 2 } else { 1 }
    }

    /// Clue tokens the team starts with. Discarding is illegal at this count.
    #[must_use]
    pub const fn max_clues(&self) -> i32 {
        if self.clue_starved {
            MAX_CLUES * 2
        } else {
            MAX_CLUES
        }
    }

    /// Ceiling applied to the bonus clue for completing a stack.
    #[must_use]
    pub const fn bonus_clue_ceiling(&self) -> i32 {
        if self.up_or_down {
            self.max_clues() * 2
        } else {
            self.max_clues()
        }
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.suits.len() as u32 * u32::from(MAX_RANK)
    }

    #[must_use]
    pub const fn initial_direction(&self) -> StackDirection {
        if self.up_or_down {
            StackDirection::Undecided
        } else {
            StackDirection::Up
        }
    }

    /// Decide whether a card of `rank` plays on a stack.
    ///
    /// Returns the new stack height and direction, or `None` for a misplay.
    #[must_use]
    pub fn play_outcome(
        &self,
        direction: StackDirection,
        stack: i8,
        rank: Rank,
    ) -> Option<(i8, StackDirection)> {
        let rank_i = rank as i8;
        let top = MAX_RANK as i8;
        match direction {
            StackDirection::Undecided if stack == START_STACK => match rank {
                2 => Some((2, StackDirection::Up)),
                4 => Some((4, StackDirection::Down)),
                _ => None,
            },
            StackDirection::Undecided => match rank {
                START_CARD_RANK => Some((START_STACK, StackDirection::Undecided)),
                1 => Some((1, StackDirection::Up)),
                MAX_RANK => Some((top, StackDirection::Down)),
                _ => None,
            },
            StackDirection::Up if rank_i == stack + 1 => {
                let next = if rank_i == top {
                    StackDirection::Finished
                } else {
                    StackDirection::Up
                };
                Some((rank_i, next))
            }
            StackDirection::Down if rank != START_CARD_RANK && rank_i == stack - 1 => {
                let next = if rank == 1 {
                    StackDirection::Finished
                } else {
                    StackDirection::Down
                };
                Some((rank_i, next))
            }
            _ => None,
        }
    }

    /// Most plays still reachable on a stack, given which ranks have at least
    /// one copy left outside the discard pile.
    #[must_use]
    pub fn remaining_plays<F>(&self, direction: StackDirection, stack: i8, available: F) -> u32
    where
        F: Fn(Rank) -> bool,
    {
        let up_from = |from: Rank| (from..=MAX_RANK).take_while(|r| available(*r)).count() as u32;
        let down_from = |from: Rank| (1..=from).rev().take_while(|r| available(*r)).count() as u32;

        match direction {
            StackDirection::Finished => 0,
            StackDirection::Up => up_from((stack + 1).max(1) as Rank),
            StackDirection::Down => down_from((stack - 1).max(0) as Rank),
            StackDirection::Undecided if stack == START_STACK => up_from(2).max(down_from(4)),
            StackDirection::Undecided => {
                let from_start = if available(START_CARD_RANK) {
                    1 + up_from(2).max(down_from(4))
                } else {
                    0
                };
                up_from(1).max(down_from(MAX_RANK)).max(from_start)
            }
        }
    }

    /// Whether a not-yet-played card of `rank` still has to go on a stack in
    /// this direction. Only the ranks strictly between the stack and the card
    /// need to be available.
    #[must_use]
    pub fn is_rank_needed<F>(&self, direction: StackDirection, stack: i8, rank: Rank, available: F) -> bool
    where
        F: Fn(Rank) -> bool,
    {
        let rank_i = rank as i8;
        match direction {
            StackDirection::Finished => false,
            StackDirection::Undecided => true,
            StackDirection::Up => {
                rank_i > stack && ((stack + 1).max(1)..rank_i).all(|r| available(r as Rank))
            }
            StackDirection::Down => {
                rank != START_CARD_RANK
                    && rank_i < stack
                    && (rank_i + 1..stack).all(|r| available(r as Rank))
            }
        }
    }

    #[must_use]
    pub fn suit_name(&self, suit: SuitIndex) -> &str {
        self.suits
            .get(usize::from(suit))
            .map_or("Unknown", |s| s.name.as_str())
    }

    #[must_use]
    pub fn card_name(&self, identity: CardIdentity) -> String {
        let suit = self.suit_name(identity.suit);
        if identity.is_start() {
            format!("{suit} START")
        } else {
            format!("{suit} {}", identity.rank)
        }
    }

    #[must_use]
    pub fn clue_name(&self, clue: &Clue) -> String {
        match clue.kind {
            ClueKind::Number => clue.value.to_string(),
            ClueKind::Color => self
                .clue_colors
                .get(usize::from(clue.value))
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_variant_deck() {
        let variant = Variant::from_name("No Variant").unwrap();
        assert_eq!(variant.num_suits(), 5);
        assert_eq!(variant.deck_identities().len(), 50);
        assert_eq!(variant.max_score(), 25);
        assert_eq!(variant.max_clues(), 8);
        assert_eq!(variant.clue_cost(), 1);
    }

    #[test]
    fn test_unknown_variant() {
        assert_eq!(
            Variant::from_name("Nonsense (5 Suits)"),
            Err(VariantError::Unknown("Nonsense (5 Suits)".to_string()))
        );
        assert!(Variant::from_name("Rainbow (9 Suits)").is_err());
        assert!(Variant::from_name("Rainbow").is_err());
    }

    #[test]
    fn test_black_suit_has_one_of_each() {
        let variant = Variant::from_name("Black (6 Suits)").unwrap();
        assert_eq!(variant.deck_identities().len(), 55);
        assert_eq!(variant.copies(CardIdentity::new(5, 1)), 1);
        assert_eq!(variant.clue_colors.last().map(String::as_str), Some("Black"));
    }

    #[test]
    fn test_rainbow_touched_by_every_color() {
        let variant = Variant::from_name("Rainbow (6 Suits)").unwrap();
        let rainbow = CardIdentity::new(5, 3);
        for color in 0..5 {
            assert!(variant.touches(&Clue::color(color), rainbow));
        }
        assert!(!variant.touches(&Clue::color(0), CardIdentity::new(1, 3)));
    }

    #[test]
    fn test_white_touched_by_no_color() {
        let variant = Variant::from_name("White (6 Suits)").unwrap();
        let white = CardIdentity::new(5, 2);
        assert!((0..5).all(|c| !variant.touches(&Clue::color(c), white)));
        assert!(variant.touches(&Clue::number(2), white));
    }

    #[test]
    fn test_color_blind_allows_empty_color_clue() {
        let variant = Variant::from_name("Color Blind (5 Suits)").unwrap();
        assert!(!variant.touches(&Clue::color(0), CardIdentity::new(0, 1)));
        assert!(variant.allows_empty_clue(&Clue::color(0)));
        assert!(!variant.allows_empty_clue(&Clue::number(1)));
    }

    #[test]
    fn test_clue_starved_economy() {
        let variant = Variant::from_name("Clue Starved (5 Suits)").unwrap();
        assert_eq!(variant.clue_cost(), 2);
        assert_eq!(variant.max_clues(), 16);
        assert_eq!(variant.bonus_clue_ceiling(), 16);
    }

    #[test]
    fn test_up_or_down_deck_and_ceiling() {
        let variant = Variant::from_name("Up or Down (5 Suits)").unwrap();
        // START, one 1, two each of 2-4, one 5
        assert_eq!(variant.deck_identities().len(), 45);
        assert_eq!(variant.bonus_clue_ceiling(), 16);
        assert!(!variant.touches(&Clue::number(0), CardIdentity::new(0, 0)));
        assert!(variant.touches(&Clue::color(0), CardIdentity::new(0, 0)));
    }

    #[test]
    fn test_ascending_play_order() {
        let variant = Variant::default();
        assert_eq!(
            variant.play_outcome(StackDirection::Up, 0, 1),
            Some((1, StackDirection::Up))
        );
        assert_eq!(variant.play_outcome(StackDirection::Up, 0, 2), None);
        assert_eq!(
            variant.play_outcome(StackDirection::Up, 4, 5),
            Some((5, StackDirection::Finished))
        );
    }

    #[test]
    fn test_up_or_down_play_order() {
        let variant = Variant::from_name("Up or Down (5 Suits)").unwrap();
        let d = StackDirection::Undecided;
        assert_eq!(variant.play_outcome(d, 0, 5), Some((5, StackDirection::Down)));
        assert_eq!(variant.play_outcome(d, 0, 0), Some((START_STACK, d)));
        assert_eq!(variant.play_outcome(d, 0, 3), None);
        assert_eq!(
            variant.play_outcome(d, START_STACK, 4),
            Some((4, StackDirection::Down))
        );
        assert_eq!(variant.play_outcome(d, START_STACK, 1), None);
        assert_eq!(
            variant.play_outcome(StackDirection::Down, 2, 1),
            Some((1, StackDirection::Finished))
        );
        assert_eq!(variant.play_outcome(StackDirection::Finished, 1, 2), None);
    }

    #[test]
    fn test_remaining_plays_stops_at_missing_rank() {
        let variant = Variant::default();
        let without_three = |r: Rank| r != 3;
        assert_eq!(variant.remaining_plays(StackDirection::Up, 0, without_three), 2);
        assert_eq!(variant.remaining_plays(StackDirection::Up, 3, without_three), 2);
        assert_eq!(variant.remaining_plays(StackDirection::Finished, 5, |_| true), 0);
    }

    #[test]
    fn test_remaining_plays_undecided_takes_best_path() {
        let variant = Variant::from_name("Up or Down (5 Suits)").unwrap();
        let without_one = |r: Rank| r != 1;
        // Down from 5 reaches 4 cards; START then up reaches 5.
        assert_eq!(
            variant.remaining_plays(StackDirection::Undecided, 0, without_one),
            5
        );
        let without_start_or_one = |r: Rank| r != 1 && r != 0;
        assert_eq!(
            variant.remaining_plays(StackDirection::Undecided, 0, without_start_or_one),
            4
        );
    }

    #[test]
    fn test_rank_needed() {
        let variant = Variant::default();
        assert!(variant.is_rank_needed(StackDirection::Up, 1, 4, |_| true));
        assert!(!variant.is_rank_needed(StackDirection::Up, 1, 4, |r| r != 2));
        assert!(!variant.is_rank_needed(StackDirection::Up, 3, 2, |_| true));
    }

    #[test]
    fn test_names() {
        let variant = Variant::from_name("Up or Down (5 Suits)").unwrap();
        assert_eq!(variant.card_name(CardIdentity::new(1, 0)), "Yellow START");
        assert_eq!(variant.card_name(CardIdentity::new(2, 4)), "Green 4");
        assert_eq!(variant.clue_name(&Clue::color(3)), "Blue");
        assert_eq!(variant.clue_name(&Clue::number(5)), "5");
    }
}
