//! Rebuilding games from their action logs.
//!
//! The log records results, not requests, so the commands are recovered from
//! the actions that only a command can produce: clues, plays, discards and
//! externally forced endings.

use thiserror::Error;

use super::actions::{Action, EndCondition, LoggedAction};
use super::entities::{CardIdentity, SeatIndex};
use super::state_machine::{Game, GameCommand, GameError, GameSetup, SetupError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplayStep {
    Command { seat: SeatIndex, command: GameCommand },
    Terminate(EndCondition),
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ReplayError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("step {step} was rejected: {error}")]
    Rejected {
        step: usize,
        #[source]
        error: GameError,
    },
}

/// Recover the commands that produced a log.
#[must_use]
pub fn steps_from_log(log: &[LoggedAction]) -> Vec<ReplayStep> {
    log.iter()
        .filter_map(|logged| match &logged.action {
            Action::Clue {
                clue,
                giver,
                target,
                ..
            } => Some(ReplayStep::Command {
                seat: *giver,
                command: GameCommand::Clue {
                    target: *target,
                    clue: *clue,
                },
            }),
            Action::Play { which }
            | Action::Discard {
                which,
                failed: true,
            } => {
                let command = if which.slot == -1 {
                    GameCommand::DeckPlay
                } else {
                    GameCommand::Play { order: which.order }
                };
                Some(ReplayStep::Command {
                    seat: which.index,
                    command,
                })
            }
            Action::Discard {
                which,
                failed: false,
            } => Some(ReplayStep::Command {
                seat: which.index,
                command: GameCommand::Discard { order: which.order },
            }),
            Action::GameOver { end_condition, .. }
                if matches!(end_condition, EndCondition::TimeLimit | EndCondition::Idle) =>
            {
                Some(ReplayStep::Terminate(*end_condition))
            }
            _ => None,
        })
        .collect()
}

/// Rebuild a game from its setup, its starting deck and its log.
///
/// # Errors
///
/// Fails if the game can't be created or if a recovered command doesn't
/// apply, which means the log doesn't belong to this setup and deck.
pub fn replay(
    setup: GameSetup,
    initial_deck: &[CardIdentity],
    log: &[LoggedAction],
) -> Result<Game, ReplayError> {
    let mut game = Game::with_deck(setup, initial_deck)?;
    for (step, replay_step) in steps_from_log(log).into_iter().enumerate() {
        let result = match replay_step {
            ReplayStep::Command { seat, command } => game.apply(seat, command).map(|_| ()),
            ReplayStep::Terminate(condition) => game.terminate(condition),
        };
        result.map_err(|error| ReplayError::Rejected { step, error })?;
    }
    Ok(game)
}
