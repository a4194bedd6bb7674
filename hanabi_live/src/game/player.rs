//! Per-seat operations.
//!
//! A [`Player`] owns only its hand and its private bookkeeping. Everything a
//! player action touches beyond that (deck, stacks, counters, action log)
//! lives in [`GameData`] and is passed in by the game.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::time::Duration;

use super::actions::{Action, Which};
use super::character::{self, Character, NO_METADATA};
use super::constants::MAX_BLIND_PLAYS;
use super::entities::{Clue, Order, SeatIndex, Sound};
use super::state_machine::{GameData, GameError};
use super::variant::StackDirection;

#[derive(Clone, Debug)]
pub struct Player {
    pub index: SeatIndex,
    pub name: String,
    /// Card orders, oldest first. The newest card is slot 1.
    pub hand: Vec<Order>,
    /// Free-form notes keyed by card order.
    pub notes: HashMap<Order, String>,
    pub time_remaining: Duration,
    pub character: Option<Character>,
    pub character_metadata: i32,
    pub character_metadata2: i32,
}

impl Player {
    #[must_use]
    pub fn new(index: SeatIndex, name: &str, time_remaining: Duration) -> Self {
        Self {
            index,
            name: name.to_string(),
            hand: Vec::new(),
            notes: HashMap::new(),
            time_remaining,
            character: None,
            character_metadata: NO_METADATA,
            character_metadata2: NO_METADATA,
        }
    }

    #[must_use]
    pub fn in_hand(&self, order: Order) -> bool {
        self.hand.contains(&order)
    }

    /// Position of a card in the hand, oldest first.
    #[must_use]
    pub fn card_index(&self, order: Order) -> Option<usize> {
        self.hand.iter().position(|o| *o == order)
    }

    /// Slot number as the players see it: 1 is the most recently drawn card.
    #[must_use]
    pub fn card_slot(&self, order: Order) -> Option<i32> {
        self.card_index(order)
            .map(|i| (self.hand.len() - i) as i32)
    }

    pub fn set_note(&mut self, order: Order, note: String) {
        if note.is_empty() {
            self.notes.remove(&order);
        } else {
            self.notes.insert(order, note);
        }
    }

    /// Orders of the cards in this hand a clue would touch.
    #[must_use]
    pub fn cards_touched_by(&self, clue: &Clue, data: &GameData) -> Vec<Order> {
        self.hand
            .iter()
            .copied()
            .filter(|order| {
                data.deck
                    .get(*order)
                    .is_some_and(|card| data.variant.touches(clue, card.identity))
            })
            .collect()
    }

    /// Give a clue to another player. Token accounting and turn checks are the
    /// game's job; this applies the clue itself.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the target is this player or if the
    /// clue touches nothing and empty clues aren't allowed.
    pub fn give_clue(
        &mut self,
        target: &Player,
        clue: Clue,
        data: &mut GameData,
    ) -> Result<Vec<Order>, GameError> {
        if target.index == self.index {
            return Err(GameError::ClueToSelf);
        }
        let list = target.cards_touched_by(&clue, data);
        if list.is_empty() && !data.variant.allows_empty_clue(&clue) && !data.options.empty_clues {
            return Err(GameError::EmptyClue);
        }

        for order in &list {
            if let Some(card) = data.deck.get_mut(*order) {
                card.touched = true;
            }
        }
        data.clues = (data.clues - data.variant.clue_cost()).max(0);

        data.push_action(Action::Clue {
            clue,
            giver: self.index,
            target: target.index,
            list: list.clone(),
            turn: data.turn,
        });

        let mut text = format!("{} tells {} ", self.name, target.name);
        if !list.is_empty() {
            text.push_str("about ");
            text.push_str(&count_word(list.len()));
            text.push(' ');
        }
        text.push_str(&data.variant.clue_name(&clue));
        if list.len() > 1 {
            text.push('s');
        }
        data.narrate(text);

        character::post_clue(self, &clue, data);
        Ok(list)
    }

    /// Take a card out of the hand, recording the slot it was in.
    ///
    /// # Errors
    ///
    /// Fails if the card isn't in this hand.
    pub fn remove_card(&mut self, order: Order, data: &mut GameData) -> Result<(), GameError> {
        let index = self
            .card_index(order)
            .ok_or(GameError::CardNotInHand(order))?;
        let slot = (self.hand.len() - index) as i32;
        let card = data
            .deck
            .get_mut(order)
            .ok_or(GameError::CardDoesNotExist(order))?;
        card.slot = slot;
        self.hand.remove(index);
        Ok(())
    }

    /// Put an already removed card on its stack. A card that doesn't fit is a
    /// strike and goes to the discard pile instead.
    ///
    /// Returns whether the result was a double discard situation.
    ///
    /// # Errors
    ///
    /// Fails if the card doesn't exist.
    pub fn play_card(&mut self, order: Order, data: &mut GameData) -> Result<bool, GameError> {
        let card = data.card(order)?.clone();
        let suit = usize::from(card.suit());
        let direction = data.stack_directions[suit];
        let outcome = data
            .variant
            .play_outcome(direction, data.stacks[suit], card.rank());

        let outcome = match outcome {
            Some(outcome) if !character::forces_misplay(self, data, card.identity) => outcome,
            _ => {
                if let Some(card) = data.deck.get_mut(order) {
                    card.failed = true;
                }
                data.strikes += 1;
                data.blind_plays = 0;
                data.push_action(Action::Strike {
                    num: data.strikes,
                    order,
                });
                return self.discard_card(order, data);
            }
        };

        let (stack, next_direction) = outcome;
        if let Some(card) = data.deck.get_mut(order) {
            card.played = true;
        }
        data.score += 1;
        data.stacks[suit] = stack;
        data.stack_directions[suit] = next_direction;

        data.push_action(Action::Play {
            which: Which {
                index: self.index,
                suit: card.suit(),
                rank: card.rank(),
                order,
                slot: card.slot,
            },
        });

        let mut text = format!(
            "{} plays {} from {}",
            self.name,
            data.variant.card_name(card.identity),
            slot_text(card.slot)
        );
        if card.touched {
            data.blind_plays = 0;
        } else {
            text.push_str(" (blind)");
            data.blind_plays = (data.blind_plays + 1).min(MAX_BLIND_PLAYS);
            data.sound = Some(Sound::Blind(data.blind_plays));
        }
        data.narrate(text);

        if next_direction == StackDirection::Finished && direction != StackDirection::Finished {
            data.clues = (data.clues + 1).min(data.variant.bonus_clue_ceiling());
        }
        data.refresh_progress();
        Ok(false)
    }

    /// Move an already removed card to the discard pile. Also used for cards
    /// that failed to play.
    ///
    /// Returns true if the last remaining copy of a still-needed card is now
    /// the only one left.
    ///
    /// # Errors
    ///
    /// Fails if the card doesn't exist.
    pub fn discard_card(&mut self, order: Order, data: &mut GameData) -> Result<bool, GameError> {
        let card = data.card(order)?.clone();

        data.push_action(Action::Discard {
            which: Which {
                index: self.index,
                suit: card.suit(),
                rank: card.rank(),
                order,
                slot: card.slot,
            },
            failed: card.failed,
        });

        let verb = if card.failed {
            data.sound = Some(Sound::Fail);
            "fails to play"
        } else {
            "discards"
        };
        let mut text = format!(
            "{} {verb} {} from {}",
            self.name,
            data.variant.card_name(card.identity),
            slot_text(card.slot)
        );
        if !card.failed && card.touched {
            text.push_str(" (clued)");
        }
        if card.failed && card.slot != -1 && !card.touched {
            text.push_str(" (blind)");
        }
        data.narrate(text);

        if let Some(card) = data.deck.get_mut(order) {
            card.discarded = true;
        }

        let max_score = data.compute_max_score();
        if max_score < data.max_score {
            data.max_score = max_score;
            if !card.failed {
                data.sound = Some(Sound::Sad);
            }
        }
        data.refresh_progress();

        let (total, discarded) = data.deck.specific_card_num(card.identity);
        Ok(total - discarded == 1 && data.needs_to_be_played(card.identity))
    }

    /// Draw the next card from the deck into this hand. Does nothing once the
    /// deck is empty. Drawing the last card starts the final round.
    pub fn draw_card(&mut self, data: &mut GameData) {
        let Some(order) = data.deck.draw() else {
            return;
        };
        let identity = data.deck.get(order).map(|card| card.identity);
        self.hand.push(order);

        data.push_action(Action::Draw {
            who: self.index,
            order,
            suit: identity.map(|i| i.suit),
            rank: identity.map(|i| i.rank),
        });
        data.push_action(Action::DrawSize {
            size: data.deck.remaining(),
        });

        if data.deck.is_exhausted() && data.end_turn.is_none() {
            data.end_turn = Some(data.turn + data.num_players as u32 + 1);
            character::adjust_end_turn(data);
            data.narrate("The final round has begun.".to_string());
        }
    }

    /// Draw the last card of the deck and play it straight away.
    ///
    /// # Errors
    ///
    /// Fails if there was no card to draw.
    pub fn play_deck(&mut self, data: &mut GameData) -> Result<bool, GameError> {
        let before = self.hand.len();
        self.draw_card(data);
        if self.hand.len() == before {
            return Err(GameError::DeckPlayNotAllowed);
        }
        let order = *self.hand.last().ok_or(GameError::DeckPlayNotAllowed)?;
        self.remove_card(order, data)?;
        if let Some(card) = data.deck.get_mut(order) {
            card.slot = -1;
        }
        self.play_card(order, data)
    }

    /// Randomly reorder the hand. Clue marks and notes on those cards are
    /// forgotten.
    pub fn shuffle_hand(&mut self, data: &mut GameData) {
        self.hand.shuffle(&mut data.rng);
        for order in &self.hand {
            if let Some(card) = data.deck.get_mut(*order) {
                card.touched = false;
            }
            self.notes.remove(order);
        }
        data.push_action(Action::Reorder {
            target: self.index,
            hand_order: self.hand.clone(),
        });
        data.narrate(format!("{} shuffles their hand", self.name));
    }
}

fn slot_text(slot: i32) -> String {
    if slot == -1 {
        "the deck".to_string()
    } else {
        format!("slot #{slot}")
    }
}

fn count_word(n: usize) -> String {
    let word = match n {
        1 => "one",
        2 => "two",
        3 => "three",
        4 => "four",
        5 => "five",
        _ => return n.to_string(),
    };
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actions::Action;
    use crate::game::entities::CardIdentity;
    use crate::game::state_machine::{Game, GameOptions, GameSetup};
    use crate::game::variant::Variant;

    fn id(suit: u8, rank: u8) -> CardIdentity {
        CardIdentity::new(suit, rank)
    }

    /// A two player No Variant game whose deck starts with `front`, followed
    /// by the rest of a full deck in order. Alice holds orders 0-4, Bob 5-9.
    fn game_with_deck(front: &[CardIdentity]) -> Game {
        let mut rest = Variant::default().deck_identities();
        for card in front {
            let i = rest.iter().position(|c| c == card).unwrap();
            rest.remove(i);
        }
        let mut deck = front.to_vec();
        deck.extend(rest);
        let setup = GameSetup {
            options: GameOptions::default(),
            player_names: vec!["Alice".to_string(), "Bob".to_string()],
            seed: 1,
        };
        Game::with_deck(setup, &deck).unwrap()
    }

    fn last_text(game: &Game) -> String {
        game.data
            .actions
            .entries()
            .iter()
            .rev()
            .find_map(|a| match &a.action {
                Action::Text { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_slots_count_from_newest() {
        let game = game_with_deck(&[]);
        let alice = &game.players[0];
        assert_eq!(alice.hand, vec![0, 1, 2, 3, 4]);
        assert_eq!(alice.card_slot(4), Some(1));
        assert_eq!(alice.card_slot(0), Some(5));
        assert_eq!(alice.card_index(2), Some(2));
        assert_eq!(alice.card_slot(7), None);
    }

    #[test]
    fn test_remove_card_records_slot() {
        let mut game = game_with_deck(&[]);
        let mut alice = game.players[0].clone();
        alice.remove_card(1, &mut game.data).unwrap();
        assert_eq!(game.data.deck.get(1).unwrap().slot, 4);
        assert_eq!(alice.hand, vec![0, 2, 3, 4]);
        assert_eq!(
            alice.remove_card(1, &mut game.data),
            Err(GameError::CardNotInHand(1))
        );
    }

    #[test]
    fn test_clue_narration() {
        let mut game = game_with_deck(&[
            id(0, 1),
            id(0, 1),
            id(0, 2),
            id(1, 1),
            id(1, 2),
            id(2, 3),
            id(2, 3),
            id(3, 1),
            id(3, 4),
            id(0, 5),
        ]);
        let mut alice = game.players[0].clone();
        let bob = game.players[1].clone();
        let list = alice
            .give_clue(&bob, Clue::number(3), &mut game.data)
            .unwrap();
        assert_eq!(list, vec![5, 6]);
        assert_eq!(last_text(&game), "Alice tells Bob about two 3s");
        assert!(game.data.deck.get(5).unwrap().touched);
        assert_eq!(game.data.clues, 7);

        alice
            .give_clue(&bob, Clue::color(0), &mut game.data)
            .unwrap();
        assert_eq!(last_text(&game), "Alice tells Bob about one Red");
    }

    #[test]
    fn test_empty_clue_changes_nothing() {
        let mut game = game_with_deck(&[]);
        let mut alice = game.players[0].clone();
        let bob = game.players[1].clone();
        let before = game.data.actions.len();
        assert_eq!(
            alice.give_clue(&bob, Clue::number(1), &mut game.data),
            Err(GameError::EmptyClue)
        );
        assert_eq!(game.data.clues, 8);
        assert_eq!(game.data.actions.len(), before);
    }

    #[test]
    fn test_blind_play_streak() {
        let mut game = game_with_deck(&[id(0, 1), id(0, 2), id(0, 3), id(0, 4), id(0, 5)]);
        let mut alice = game.players[0].clone();
        for (i, order) in [0, 1, 2, 3, 4].into_iter().enumerate() {
            alice.remove_card(order, &mut game.data).unwrap();
            assert!(!alice.play_card(order, &mut game.data).unwrap());
            let expected = (i as u8 + 1).min(MAX_BLIND_PLAYS);
            assert_eq!(game.data.sound, Some(Sound::Blind(expected)));
        }
        assert_eq!(game.data.score, 5);
        assert_eq!(game.data.stack_directions[0], StackDirection::Finished);
        assert_eq!(last_text(&game), "Alice plays Red 5 from slot #1 (blind)");
        // Completing the stack at the ceiling doesn't add a clue.
        assert_eq!(game.data.clues, 8);
    }

    #[test]
    fn test_misplay_strikes_and_discards() {
        let mut game = game_with_deck(&[id(0, 3)]);
        let mut alice = game.players[0].clone();
        alice.remove_card(0, &mut game.data).unwrap();
        alice.play_card(0, &mut game.data).unwrap();
        let card = game.data.deck.get(0).unwrap();
        assert!(card.failed && card.discarded && !card.played);
        assert_eq!(game.data.strikes, 1);
        assert_eq!(game.data.sound, Some(Sound::Fail));
        assert_eq!(last_text(&game), "Alice fails to play Red 3 from slot #5 (blind)");
    }

    #[test]
    fn test_discarding_a_five_lowers_max_score() {
        let mut game = game_with_deck(&[id(0, 5)]);
        let mut alice = game.players[0].clone();
        game.data.clues = 4;
        alice.remove_card(0, &mut game.data).unwrap();
        let double = alice.discard_card(0, &mut game.data).unwrap();
        assert!(!double);
        assert_eq!(game.data.max_score, 24);
        assert_eq!(game.data.sound, Some(Sound::Sad));
        assert_eq!(last_text(&game), "Alice discards Red 5 from slot #5");
    }

    #[test]
    fn test_double_discard_detection() {
        let mut game = game_with_deck(&[id(0, 2)]);
        let mut alice = game.players[0].clone();
        alice.remove_card(0, &mut game.data).unwrap();
        assert!(alice.discard_card(0, &mut game.data).unwrap());

        let mut game = game_with_deck(&[id(0, 1)]);
        let mut alice = game.players[0].clone();
        alice.remove_card(0, &mut game.data).unwrap();
        // Two more Red 1s are still around.
        assert!(!alice.discard_card(0, &mut game.data).unwrap());
    }

    #[test]
    fn test_shuffle_hand_forgets_clues_and_notes() {
        let mut game = game_with_deck(&[]);
        let mut alice = game.players[0].clone();
        alice.set_note(2, "chop".to_string());
        game.data.deck.get_mut(2).unwrap().touched = true;
        alice.shuffle_hand(&mut game.data);

        let mut sorted = alice.hand.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
        assert!(alice.notes.is_empty());
        assert!(!game.data.deck.get(2).unwrap().touched);
        assert!(matches!(
            game.data.actions.last().map(|a| &a.action),
            Some(Action::Text { .. })
        ));
    }

    #[test]
    fn test_draw_last_card_sets_end_turn_once() {
        let mut game = game_with_deck(&[]);
        let mut alice = game.players[0].clone();
        while game.data.deck.remaining() > 0 {
            alice.draw_card(&mut game.data);
        }
        assert_eq!(game.data.end_turn, Some(game.data.turn + 3));
        let log_len = game.data.actions.len();
        alice.draw_card(&mut game.data);
        assert_eq!(game.data.actions.len(), log_len);
    }
}
