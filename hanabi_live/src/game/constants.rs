use std::time::Duration;

/// Clue tokens a team starts with (and the usual ceiling).
pub const MAX_CLUES: i32 = 8;

/// The game is lost on this strike.
pub const MAX_STRIKES: u8 = 3;

/// There's no celebratory cue beyond four blind plays in a row.
pub const MAX_BLIND_PLAYS: u8 = 4;

/// Highest normal rank of a suit.
pub const MAX_RANK: u8 = 5;

/// Rank used by "START" cards in Up or Down variants.
pub const START_CARD_RANK: u8 = 0;

/// Stack height recorded after a "START" card is played. It sits below 1 so
/// that an empty stack (0) can still be told apart.
pub const START_STACK: i8 = -1;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

/// Longest chat message or card note we keep.
pub const MAX_USER_INPUT_LENGTH: usize = 300;

/// How long a table may sit without a command before it's killed.
pub const IDLE_GAME_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Number of cards dealt to each player, by player count.
#[must_use]
pub const fn hand_size(num_players: usize) -> usize {
    match num_players {
        0..=3 => 5,
        4 | 5 => 4,
        _ => 3,
    }
}
