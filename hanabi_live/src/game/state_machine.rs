//! Game state machine.
//!
//! A [`Game`] moves from dealing to running to finished and never goes back.
//! While running, it accepts one [`GameCommand`] at a time from the active
//! seat, validates it against the current state, applies it through the
//! [`Player`] operations, and advances the turn. Every observable change is
//! appended to the game's action log.

use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::actions::{Action, ActionLog, EndCondition};
use super::character::{self, Character};
use super::constants::{self, MAX_PLAYERS, MAX_RANK, MAX_STRIKES, MIN_PLAYERS};
use super::entities::{Card, CardIdentity, Clue, ClueKind, Deck, Order, SeatIndex, Sound, SuitIndex};
use super::player::Player;
use super::variant::{DEFAULT_VARIANT, StackDirection, Variant, VariantError};

/// In-game randomness (character draws, hand shuffles) uses its own stream so
/// a game rebuilt from a recorded deck sees the same random choices.
const PLAY_RNG_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Reasons a command is rejected. A rejected command never changes the game.
#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("game hasn't started")]
    NotRunning,
    #[error("game is over")]
    GameOver,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("seat {0} does not exist")]
    InvalidSeat(SeatIndex),
    #[error("can't give a clue to yourself")]
    ClueToSelf,
    #[error("invalid clue")]
    InvalidClue,
    #[error("clue doesn't touch any cards")]
    EmptyClue,
    #[error("not enough clue tokens")]
    NoClueTokens,
    #[error("card {0} isn't in your hand")]
    CardNotInHand(Order),
    #[error("card {0} does not exist")]
    CardDoesNotExist(Order),
    #[error("can't discard at the maximum number of clues")]
    DiscardAtMaxClues,
    #[error("deck plays aren't allowed right now")]
    DeckPlayNotAllowed,
    #[error("{character} can't {reason}")]
    CharacterRestriction { character: Character, reason: String },
}

/// Problems with a game's configuration. These are fatal: the game can't be
/// created at all.
#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum SetupError {
    #[error(transparent)]
    Variant(#[from] VariantError),
    #[error("unsupported number of players: {0}")]
    PlayerCount(usize),
    #[error("deck doesn't fit the variant")]
    InvalidDeck,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GameOptions {
    pub variant: String,
    /// Clues that touch no cards are legal.
    pub empty_clues: bool,
    /// The last card of the deck may be played straight from the deck.
    pub deck_plays: bool,
    pub character_assignments: bool,
    pub timed: bool,
    pub base_time_secs: u64,
    /// Added to a player's clock after each of their moves.
    pub time_per_turn_secs: u64,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            variant: DEFAULT_VARIANT.to_string(),
            empty_clues: false,
            deck_plays: false,
            character_assignments: false,
            timed: false,
            base_time_secs: 120,
            time_per_turn_secs: 20,
        }
    }
}

/// Everything needed to create a game. Together with the initial deck and the
/// action log, this reproduces the game exactly.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSetup {
    pub options: GameOptions,
    pub player_names: Vec<String>,
    pub seed: u64,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    Dealing,
    Running,
    Finished(EndCondition),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameCommand {
    Clue { target: SeatIndex, clue: Clue },
    Play { order: Order },
    Discard { order: Order },
    DeckPlay,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MoveOutcome {
    /// The last copy of a still-needed card is the only one left.
    pub double_discard: bool,
    pub finished: bool,
}

/// Mutable game data shared by all player operations.
#[derive(Clone, Debug)]
pub struct GameData {
    pub variant: Variant,
    pub options: GameOptions,
    pub deck: Deck,
    pub status: GameStatus,
    /// Clue tokens. Clue Starved keeps these in halves.
    pub clues: i32,
    pub strikes: u8,
    pub score: u32,
    /// Best score still reachable. Only ever goes down.
    pub max_score: u32,
    pub stacks: Vec<i8>,
    pub stack_directions: Vec<StackDirection>,
    pub turn: u32,
    /// The game ends when `turn` reaches this. Set when the deck runs out.
    pub end_turn: Option<u32>,
    pub blind_plays: u8,
    /// Cue for the next turn announcement.
    pub sound: Option<Sound>,
    /// Percent of the reachable score already on the stacks.
    pub progress: u32,
    pub num_players: usize,
    pub characters: Vec<Option<Character>>,
    pub actions: ActionLog,
    pub(crate) rng: StdRng,
}

impl GameData {
    pub(crate) fn push_action(&mut self, action: Action) {
        self.actions.push(self.turn, action);
    }

    pub(crate) fn narrate(&mut self, text: String) {
        debug!("turn {}: {text}", self.turn);
        self.push_action(Action::Text { text });
    }

    /// # Errors
    ///
    /// Fails if no card has this order.
    pub fn card(&self, order: Order) -> Result<&Card, GameError> {
        self.deck.get(order).ok_or(GameError::CardDoesNotExist(order))
    }

    /// At least one copy of the card is outside the discard pile.
    #[must_use]
    pub fn is_available(&self, identity: CardIdentity) -> bool {
        let (total, discarded) = self.deck.specific_card_num(identity);
        total > discarded
    }

    /// A copy of this card must still reach the stacks for a perfect game.
    #[must_use]
    pub fn needs_to_be_played(&self, identity: CardIdentity) -> bool {
        if self.deck.is_played(identity) {
            return false;
        }
        let suit = usize::from(identity.suit);
        self.variant.is_rank_needed(
            self.stack_directions[suit],
            self.stacks[suit],
            identity.rank,
            |rank| self.is_available(CardIdentity::new(identity.suit, rank)),
        )
    }

    /// Best score reachable from here, given what has been played and what is
    /// gone for good.
    #[must_use]
    pub fn compute_max_score(&self) -> u32 {
        (0..self.variant.num_suits())
            .map(|suit| {
                let suit_index = suit as SuitIndex;
                let played = self
                    .deck
                    .iter()
                    .filter(|c| c.played && c.suit() == suit_index)
                    .count() as u32;
                played
                    + self.variant.remaining_plays(
                        self.stack_directions[suit],
                        self.stacks[suit],
                        |rank| self.is_available(CardIdentity::new(suit_index, rank)),
                    )
            })
            .sum()
    }

    pub(crate) fn refresh_progress(&mut self) {
        self.progress = if self.max_score == 0 {
            100
        } else {
            (self.score * 200 + self.max_score) / (self.max_score * 2)
        };
    }

    fn status_action(&self) -> Action {
        Action::Status {
            clues: self.clues,
            score: self.score,
            max_score: self.max_score,
            progress: self.progress,
        }
    }
}

/// Read-only snapshot of a game.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSummary {
    pub variant: String,
    pub status: GameStatus,
    pub players: Vec<String>,
    pub turn: u32,
    pub active_player: SeatIndex,
    pub clues: i32,
    pub strikes: u8,
    pub score: u32,
    pub max_score: u32,
    pub stacks: Vec<i8>,
    pub deck_remaining: usize,
    pub end_turn: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct Game {
    pub data: GameData,
    pub players: Vec<Player>,
    setup: GameSetup,
    initial_deck: Vec<CardIdentity>,
    active_player: SeatIndex,
    turns_inverted: bool,
}

impl Game {
    /// Create a game with a deck shuffled from the setup's seed, deal the
    /// hands, and start it.
    ///
    /// # Errors
    ///
    /// Fails on an unknown variant or an unsupported number of players.
    pub fn new(setup: GameSetup) -> Result<Self, SetupError> {
        let variant = Variant::from_name(&setup.options.variant)?;
        let mut deck_rng = StdRng::seed_from_u64(setup.seed);
        let mut identities = variant.deck_identities();
        identities.shuffle(&mut deck_rng);
        Self::build(setup, variant, identities)
    }

    /// Create a game that draws from exactly the given deck.
    ///
    /// # Errors
    ///
    /// Fails on an unknown variant, an unsupported number of players, or a
    /// deck holding cards the variant doesn't have.
    pub fn with_deck(setup: GameSetup, identities: &[CardIdentity]) -> Result<Self, SetupError> {
        let variant = Variant::from_name(&setup.options.variant)?;
        let fits = identities.iter().all(|card| {
            usize::from(card.suit) < variant.num_suits() && card.rank <= MAX_RANK
        });
        if !fits {
            return Err(SetupError::InvalidDeck);
        }
        Self::build(setup, variant, identities.to_vec())
    }

    fn build(
        setup: GameSetup,
        variant: Variant,
        identities: Vec<CardIdentity>,
    ) -> Result<Self, SetupError> {
        let num_players = setup.player_names.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
            return Err(SetupError::PlayerCount(num_players));
        }
        let hand_size = constants::hand_size(num_players);
        if identities.len() < hand_size * num_players {
            return Err(SetupError::InvalidDeck);
        }

        let options = setup.options.clone();
        let base_time = if options.timed {
            Duration::from_secs(options.base_time_secs)
        } else {
            Duration::ZERO
        };
        let mut players: Vec<Player> = setup
            .player_names
            .iter()
            .enumerate()
            .map(|(index, name)| Player::new(index, name, base_time))
            .collect();

        let mut rng = StdRng::seed_from_u64(setup.seed ^ PLAY_RNG_SALT);
        if options.character_assignments {
            let mut pool = Character::ALL.to_vec();
            pool.shuffle(&mut rng);
            for (player, character) in players.iter_mut().zip(pool.iter().cycle()) {
                player.character = Some(*character);
            }
        }

        let num_suits = variant.num_suits();
        let mut data = GameData {
            max_score: variant.max_score(),
            clues: variant.max_clues(),
            stacks: vec![0; num_suits],
            stack_directions: vec![variant.initial_direction(); num_suits],
            deck: Deck::from_identities(&identities),
            status: GameStatus::Dealing,
            strikes: 0,
            score: 0,
            turn: 0,
            end_turn: None,
            blind_plays: 0,
            sound: None,
            progress: 0,
            num_players,
            characters: players.iter().map(|p| p.character).collect(),
            actions: ActionLog::new(),
            rng,
            variant,
            options,
        };

        for player in &players {
            if let Some(character) = player.character {
                data.narrate(format!("{} is {character}", player.name));
            }
        }
        for player in &mut players {
            for _ in 0..hand_size {
                player.draw_card(&mut data);
            }
        }

        data.status = GameStatus::Running;
        data.push_action(data.status_action());
        data.push_action(Action::Turn {
            num: 0,
            who: 0,
            sound: None,
        });
        info!(
            "started {} game with {num_players} players and {} cards",
            data.variant.name,
            identities.len()
        );

        Ok(Self {
            data,
            players,
            setup,
            initial_deck: identities,
            active_player: 0,
            turns_inverted: false,
        })
    }

    #[must_use]
    pub fn setup(&self) -> &GameSetup {
        &self.setup
    }

    /// Deck order as it was before the first card was dealt.
    #[must_use]
    pub fn initial_deck(&self) -> &[CardIdentity] {
        &self.initial_deck
    }

    #[must_use]
    pub const fn active_player(&self) -> SeatIndex {
        self.active_player
    }

    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.data.status
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.data.status, GameStatus::Finished(_))
    }

    #[must_use]
    pub const fn turns_inverted(&self) -> bool {
        self.turns_inverted
    }

    #[must_use]
    pub fn seat_of(&self, name: &str) -> Option<SeatIndex> {
        self.players.iter().position(|p| p.name == name)
    }

    /// Apply a command on behalf of `seat`.
    ///
    /// # Errors
    ///
    /// Returns the reason the command is illegal. Nothing changes when a
    /// command is rejected.
    pub fn apply(&mut self, seat: SeatIndex, command: GameCommand) -> Result<MoveOutcome, GameError> {
        match self.data.status {
            GameStatus::Running => {}
            GameStatus::Dealing => return Err(GameError::NotRunning),
            GameStatus::Finished(_) => return Err(GameError::GameOver),
        }
        if seat >= self.players.len() {
            return Err(GameError::InvalidSeat(seat));
        }
        if seat != self.active_player {
            return Err(GameError::OutOfTurnAction);
        }

        let double_discard = match command {
            GameCommand::Clue { target, clue } => {
                self.clue(seat, target, clue)?;
                false
            }
            GameCommand::Play { order } => {
                let player = &mut self.players[seat];
                if !player.in_hand(order) {
                    return Err(GameError::CardNotInHand(order));
                }
                player.remove_card(order, &mut self.data)?;
                let double_discard = player.play_card(order, &mut self.data)?;
                player.draw_card(&mut self.data);
                double_discard
            }
            GameCommand::Discard { order } => {
                let player = &mut self.players[seat];
                if !player.in_hand(order) {
                    return Err(GameError::CardNotInHand(order));
                }
                let max_clues = self.data.variant.max_clues();
                if self.data.clues >= max_clues {
                    return Err(GameError::DiscardAtMaxClues);
                }
                player.remove_card(order, &mut self.data)?;
                let double_discard = player.discard_card(order, &mut self.data)?;
                self.data.clues = (self.data.clues + 1).min(max_clues);
                player.draw_card(&mut self.data);
                double_discard
            }
            GameCommand::DeckPlay => {
                if !self.data.options.deck_plays || self.data.deck.remaining() != 1 {
                    return Err(GameError::DeckPlayNotAllowed);
                }
                self.players[seat].play_deck(&mut self.data)?
            }
        };

        self.end_turn();
        Ok(MoveOutcome {
            double_discard,
            finished: self.is_finished(),
        })
    }

    fn clue(&mut self, seat: SeatIndex, target: SeatIndex, clue: Clue) -> Result<(), GameError> {
        if target >= self.players.len() {
            return Err(GameError::InvalidSeat(target));
        }
        if target == seat {
            return Err(GameError::ClueToSelf);
        }
        if !self.data.variant.is_valid_clue(&clue) {
            return Err(GameError::InvalidClue);
        }
        if self.data.clues < self.data.variant.clue_cost() {
            return Err(GameError::NoClueTokens);
        }
        character::validate_clue(&self.players[seat], &clue)?;

        let (giver, receiver) = giver_and_target(&mut self.players, seat, target);
        giver.give_clue(receiver, clue, &mut self.data)?;
        Ok(())
    }

    fn end_turn(&mut self) {
        let mover = self.active_player;
        if character::inverts_turn_order(&self.players[mover]) {
            self.turns_inverted = !self.turns_inverted;
        }
        if self.data.options.timed {
            self.players[mover].time_remaining +=
                Duration::from_secs(self.data.options.time_per_turn_secs);
        }

        let num_players = self.players.len();
        self.active_player = if self.turns_inverted {
            (mover + num_players - 1) % num_players
        } else {
            (mover + 1) % num_players
        };
        self.data.turn += 1;

        self.data.push_action(self.data.status_action());
        let sound = self.data.sound.take();
        self.data.push_action(Action::Turn {
            num: self.data.turn,
            who: self.active_player,
            sound,
        });

        if self.data.strikes >= MAX_STRIKES {
            self.finish(EndCondition::Strikeout);
        } else if self.data.score >= self.data.max_score
            || self.data.end_turn.is_some_and(|end| self.data.turn >= end)
        {
            self.finish(EndCondition::Normal);
        }
    }

    /// End a running game from outside (clock ran out, table went idle).
    ///
    /// # Errors
    ///
    /// Fails if the game isn't running.
    pub fn terminate(&mut self, condition: EndCondition) -> Result<(), GameError> {
        match self.data.status {
            GameStatus::Running => {
                self.finish(condition);
                Ok(())
            }
            GameStatus::Dealing => Err(GameError::NotRunning),
            GameStatus::Finished(_) => Err(GameError::GameOver),
        }
    }

    fn finish(&mut self, condition: EndCondition) {
        self.data.status = GameStatus::Finished(condition);
        let text = match condition {
            EndCondition::Normal => format!("Players score {} points.", self.data.score),
            EndCondition::Strikeout => "Players lose after three strikes.".to_string(),
            EndCondition::TimeLimit => "Players ran out of time.".to_string(),
            EndCondition::Idle => "Players were idle for too long.".to_string(),
        };
        self.data.narrate(text);
        self.data.push_action(Action::GameOver {
            end_condition: condition,
            score: self.data.score,
        });
        info!(
            "game over ({condition}) on turn {} with score {}/{}",
            self.data.turn, self.data.score, self.data.max_score
        );
    }

    /// Clock left for the active player, for timed games that are running.
    #[must_use]
    pub fn active_clock(&self) -> Option<Duration> {
        if self.data.options.timed && self.data.status == GameStatus::Running {
            Some(self.players[self.active_player].time_remaining)
        } else {
            None
        }
    }

    /// Charge time spent thinking to a player. Returns false once their clock
    /// is empty. Untimed games never run out.
    pub fn charge_clock(&mut self, seat: SeatIndex, elapsed: Duration) -> bool {
        if !self.data.options.timed {
            return true;
        }
        let Some(player) = self.players.get_mut(seat) else {
            return true;
        };
        player.time_remaining = player.time_remaining.saturating_sub(elapsed);
        !player.time_remaining.is_zero()
    }

    /// Every command the active player could make right now.
    #[must_use]
    pub fn legal_commands(&self) -> Vec<GameCommand> {
        if self.data.status != GameStatus::Running {
            return Vec::new();
        }
        let seat = self.active_player;
        let player = &self.players[seat];
        let mut commands = Vec::new();

        if self.data.clues >= self.data.variant.clue_cost() {
            let clues = (1..=MAX_RANK)
                .map(Clue::number)
                .chain((0..self.data.variant.clue_colors.len() as u8).map(Clue::color));
            for clue in clues {
                if character::validate_clue(player, &clue).is_err() {
                    continue;
                }
                for target in self.players.iter().filter(|p| p.index != seat) {
                    let touches = !target.cards_touched_by(&clue, &self.data).is_empty();
                    if touches
                        || self.data.options.empty_clues
                        || self.data.variant.allows_empty_clue(&clue)
                    {
                        commands.push(GameCommand::Clue {
                            target: target.index,
                            clue,
                        });
                    }
                }
            }
        }
        for order in &player.hand {
            commands.push(GameCommand::Play { order: *order });
        }
        if self.data.clues < self.data.variant.max_clues() {
            for order in &player.hand {
                commands.push(GameCommand::Discard { order: *order });
            }
        }
        if self.data.options.deck_plays && self.data.deck.remaining() == 1 {
            commands.push(GameCommand::DeckPlay);
        }
        commands
    }

    #[must_use]
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            variant: self.data.variant.name.clone(),
            status: self.data.status,
            players: self.players.iter().map(|p| p.name.clone()).collect(),
            turn: self.data.turn,
            active_player: self.active_player,
            clues: self.data.clues,
            strikes: self.data.strikes,
            score: self.data.score,
            max_score: self.data.max_score,
            stacks: self.data.stacks.clone(),
            deck_remaining: self.data.deck.remaining(),
            end_turn: self.data.end_turn,
        }
    }

    /// Number of clues of each type given so far, as `(number, color)`.
    #[must_use]
    pub fn clue_counts(&self) -> (usize, usize) {
        self.data
            .actions
            .entries()
            .iter()
            .fold((0, 0), |(number, color), logged| match &logged.action {
                Action::Clue { clue, .. } if clue.kind == ClueKind::Number => (number + 1, color),
                Action::Clue { .. } => (number, color + 1),
                _ => (number, color),
            })
    }
}

/// Borrow the clue giver mutably and the receiver immutably. The seats must
/// differ.
fn giver_and_target(
    players: &mut [Player],
    giver: SeatIndex,
    target: SeatIndex,
) -> (&mut Player, &Player) {
    if giver < target {
        let (left, right) = players.split_at_mut(target);
        (&mut left[giver], &right[0])
    } else {
        let (left, right) = players.split_at_mut(giver);
        (&mut right[0], &left[target])
    }
}
