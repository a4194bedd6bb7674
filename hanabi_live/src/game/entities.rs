use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants;

/// Index into a variant's suit list.
pub type SuitIndex = u8;

/// Card rank. 1 through 5 are normal ranks; 0 is a "START" card.
pub type Rank = u8;

/// A card's position in the shuffled deck. This is the card's permanent
/// identity for the whole game (notes, history, duplicate detection).
pub type Order = usize;

/// Type alias for seat positions during the game.
pub type SeatIndex = usize;

/// What a card *is*, independent of where it is.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CardIdentity {
    pub suit: SuitIndex,
    pub rank: Rank,
}

impl CardIdentity {
    #[must_use]
    pub const fn new(suit: SuitIndex, rank: Rank) -> Self {
        Self { suit, rank }
    }

    #[must_use]
    pub const fn is_start(&self) -> bool {
        self.rank == constants::START_CARD_RANK
    }
}

impl fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_start() {
            write!(f, "{}/S", self.suit)
        } else {
            write!(f, "{}/{}", self.suit, self.rank)
        }
    }
}

/// A physical card of the deck along with everything that has happened to it.
///
/// `touched`, `played`, `failed` and `discarded` only ever go from false to
/// true, with one exception: shuffling a hand forgets clue information and
/// clears `touched`. `slot` is written once, when the card leaves a hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub identity: CardIdentity,
    pub order: Order,
    pub touched: bool,
    pub played: bool,
    pub failed: bool,
    pub discarded: bool,
    /// Slot the card occupied when it was removed (1 = newest). -1 means it
    /// went straight from the deck to the stacks.
    pub slot: i32,
}

impl Card {
    #[must_use]
    pub fn new(identity: CardIdentity, order: Order) -> Self {
        Self {
            identity,
            order,
            touched: false,
            played: false,
            failed: false,
            discarded: false,
            slot: 0,
        }
    }

    #[must_use]
    pub const fn suit(&self) -> SuitIndex {
        self.identity.suit
    }

    #[must_use]
    pub const fn rank(&self) -> Rank {
        self.identity.rank
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClueKind {
    Number,
    Color,
}

impl fmt::Display for ClueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Number => "number",
            Self::Color => "color",
        };
        write!(f, "{repr}")
    }
}

/// A clue is a kind plus a value. Number clues carry the rank itself;
/// color clues carry an index into the variant's clue colors.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Clue {
    #[serde(rename = "type")]
    pub kind: ClueKind,
    pub value: u8,
}

impl Clue {
    #[must_use]
    pub const fn number(rank: Rank) -> Self {
        Self {
            kind: ClueKind::Number,
            value: rank,
        }
    }

    #[must_use]
    pub const fn color(color: u8) -> Self {
        Self {
            kind: ClueKind::Color,
            value: color,
        }
    }
}

/// Audio cues the clients play at the start of the next turn.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Sound {
    /// Blind-play streak of the given length (1..=4).
    Blind(u8),
    Fail,
    Sad,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Blind(n) => write!(f, "blind{n}"),
            Self::Fail => write!(f, "fail"),
            Self::Sad => write!(f, "sad"),
        }
    }
}

/// The deck is built once when the game starts and is never reordered after
/// the initial shuffle. Cards are indexed by their order, and `deck_idx`
/// points at the next card to draw.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    pub deck_idx: usize,
}

impl Deck {
    /// Build a deck that keeps the given card order.
    #[must_use]
    pub fn from_identities(identities: &[CardIdentity]) -> Self {
        let cards = identities
            .iter()
            .enumerate()
            .map(|(order, identity)| Card::new(*identity, order))
            .collect();
        Self { cards, deck_idx: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards left to draw.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.deck_idx)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.deck_idx >= self.cards.len()
    }

    /// Advance the cursor and return the order of the drawn card, if any.
    pub fn draw(&mut self) -> Option<Order> {
        if self.is_exhausted() {
            return None;
        }
        let order = self.deck_idx;
        self.deck_idx += 1;
        Some(order)
    }

    #[must_use]
    pub fn get(&self, order: Order) -> Option<&Card> {
        self.cards.get(order)
    }

    pub fn get_mut(&mut self, order: Order) -> Option<&mut Card> {
        self.cards.get_mut(order)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// The card identities in deck order, as they were at the start.
    #[must_use]
    pub fn identities(&self) -> Vec<CardIdentity> {
        self.cards.iter().map(|c| c.identity).collect()
    }

    /// Return `(total, discarded)` copies of a specific card.
    #[must_use]
    pub fn specific_card_num(&self, identity: CardIdentity) -> (usize, usize) {
        self.cards
            .iter()
            .filter(|c| c.identity == identity)
            .fold((0, 0), |(total, discarded), c| {
                (total + 1, discarded + usize::from(c.discarded))
            })
    }

    /// Whether a copy of this card already made it onto the stacks.
    #[must_use]
    pub fn is_played(&self, identity: CardIdentity) -> bool {
        self.cards
            .iter()
            .any(|c| c.identity == identity && c.played)
    }

    /// Number of cards of a rank (any suit) that have been played.
    #[must_use]
    pub fn num_played_of_rank(&self, rank: Rank) -> usize {
        self.cards
            .iter()
            .filter(|c| c.played && c.rank() == rank)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities() -> Vec<CardIdentity> {
        vec![
            CardIdentity::new(0, 1),
            CardIdentity::new(0, 1),
            CardIdentity::new(0, 2),
            CardIdentity::new(1, 5),
        ]
    }

    #[test]
    fn test_orders_follow_deck_position() {
        let deck = Deck::from_identities(&identities());
        for (i, card) in deck.iter().enumerate() {
            assert_eq!(card.order, i);
        }
        assert_eq!(deck.len(), 4);
    }

    #[test]
    fn test_draw_until_exhausted() {
        let mut deck = Deck::from_identities(&identities());
        assert_eq!(deck.draw(), Some(0));
        assert_eq!(deck.draw(), Some(1));
        assert_eq!(deck.remaining(), 2);
        deck.draw();
        deck.draw();
        assert!(deck.is_exhausted());
        assert_eq!(deck.draw(), None);
        assert_eq!(deck.deck_idx, 4);
    }

    #[test]
    fn test_specific_card_num_counts_discards() {
        let mut deck = Deck::from_identities(&identities());
        let one = CardIdentity::new(0, 1);
        assert_eq!(deck.specific_card_num(one), (2, 0));
        deck.get_mut(1).unwrap().discarded = true;
        assert_eq!(deck.specific_card_num(one), (2, 1));
    }

    #[test]
    fn test_played_lookups() {
        let mut deck = Deck::from_identities(&identities());
        assert!(!deck.is_played(CardIdentity::new(0, 2)));
        deck.get_mut(2).unwrap().played = true;
        assert!(deck.is_played(CardIdentity::new(0, 2)));
        assert_eq!(deck.num_played_of_rank(2), 1);
        assert_eq!(deck.num_played_of_rank(1), 0);
    }

    #[test]
    fn test_sound_display() {
        assert_eq!(Sound::Blind(3).to_string(), "blind3");
        assert_eq!(Sound::Sad.to_string(), "sad");
    }
}
