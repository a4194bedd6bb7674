/// Property-based tests for the game rules using proptest
///
/// Games are driven by picking among the legal commands at each turn, so
/// every run explores a different but valid path through a game.
use hanabi_live::game::{
    Clue, EndCondition, Game, GameCommand, GameError, GameOptions, GameSetup, GameStatus,
    constants::MAX_RANK, replay,
};
use proptest::prelude::*;

const VARIANTS: &[&str] = &[
    "No Variant",
    "Three Suits",
    "Six Suits",
    "Rainbow (5 Suits)",
    "White (5 Suits)",
    "Black (6 Suits)",
    "Color Blind (4 Suits)",
    "Up or Down (5 Suits)",
    "Clue Starved (5 Suits)",
];

// Strategy to generate a game setup across variants and table options
fn setup_strategy() -> impl Strategy<Value = GameSetup> {
    (
        prop::sample::select(VARIANTS),
        2usize..=6,
        any::<u64>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(variant, num_players, seed, empty_clues, deck_plays, characters)| GameSetup {
                options: GameOptions {
                    variant: variant.to_string(),
                    empty_clues,
                    deck_plays,
                    character_assignments: characters,
                    ..GameOptions::default()
                },
                player_names: (0..num_players).map(|i| format!("player{i}")).collect(),
                seed,
            },
        )
}

// Strategy to generate the choices made at each turn
fn choices_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 1..200)
}

/// Apply one legal command picked by `choice`. Returns false once the game
/// has nothing left to do.
fn step(game: &mut Game, choice: usize) -> bool {
    let commands = game.legal_commands();
    if commands.is_empty() {
        return false;
    }
    let command = commands[choice % commands.len()].clone();
    let seat = game.active_player();
    // Character restrictions can still refuse a listed command.
    let _ = game.apply(seat, command);
    true
}

proptest! {
    #[test]
    fn test_strikes_never_decrease(setup in setup_strategy(), choices in choices_strategy()) {
        let mut game = Game::new(setup).unwrap();
        let mut strikes = game.data.strikes;

        for choice in choices {
            if !step(&mut game, choice) {
                break;
            }
            prop_assert!(game.data.strikes >= strikes, "strikes went down");
            prop_assert!(game.data.strikes <= 3);
            strikes = game.data.strikes;
        }

        if game.data.strikes == 3 {
            prop_assert_eq!(game.status(), GameStatus::Finished(EndCondition::Strikeout));
            let before = game.summary();
            let seat = game.active_player();
            prop_assert_eq!(
                game.apply(seat, GameCommand::Play { order: 0 }),
                Err(GameError::GameOver)
            );
            prop_assert_eq!(game.summary(), before);
        }
    }

    #[test]
    fn test_max_score_never_increases(setup in setup_strategy(), choices in choices_strategy()) {
        let mut game = Game::new(setup).unwrap();
        let mut max_score = game.data.max_score;

        for choice in choices {
            if !step(&mut game, choice) {
                break;
            }
            prop_assert!(game.data.max_score <= max_score, "max score went up");
            prop_assert!(game.data.score <= game.data.max_score || game.is_finished());
            max_score = game.data.max_score;
        }
    }

    #[test]
    fn test_empty_clues_are_rejected_without_change(
        setup in setup_strategy(),
        rank in 1u8..=MAX_RANK,
        color in 0u8..6,
        use_color in any::<bool>(),
    ) {
        let mut game = Game::new(setup).unwrap();
        let num_colors = game.data.variant.clue_colors.len() as u8;
        let clue = if use_color && num_colors > 0 {
            Clue::color(color % num_colors)
        } else {
            Clue::number(rank)
        };
        let target = 1;
        let touched = game.players[target].cards_touched_by(&clue, &game.data);
        let exempt = game.data.options.empty_clues || game.data.variant.allows_empty_clue(&clue);
        let clues = game.data.clues;
        let logged = game.data.actions.len();

        let result = game.apply(0, GameCommand::Clue { target, clue });

        if touched.is_empty() && !exempt {
            prop_assert_eq!(result, Err(GameError::EmptyClue));
            prop_assert_eq!(game.data.clues, clues);
            prop_assert_eq!(game.data.actions.len(), logged);
        }
    }

    #[test]
    fn test_replay_reproduces_finished_game(setup in setup_strategy(), choices in choices_strategy()) {
        let mut game = Game::new(setup.clone()).unwrap();
        for choice in choices {
            if !step(&mut game, choice) {
                break;
            }
        }
        if !game.is_finished() {
            game.terminate(EndCondition::Idle).unwrap();
        }

        let replayed = replay(setup, game.initial_deck(), game.data.actions.entries()).unwrap();

        prop_assert_eq!(replayed.data.score, game.data.score);
        prop_assert_eq!(replayed.data.strikes, game.data.strikes);
        prop_assert_eq!(&replayed.data.stacks, &game.data.stacks);
        prop_assert_eq!(
            serde_json::to_string(&replayed.summary()).unwrap(),
            serde_json::to_string(&game.summary()).unwrap()
        );
        prop_assert_eq!(replayed.data.actions.entries(), game.data.actions.entries());
    }
}
