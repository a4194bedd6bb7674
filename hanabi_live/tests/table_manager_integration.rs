//! Table manager integration tests.
//!
//! These drive tables through the manager the way a front end would: join,
//! start, subscribe, send moves, and watch what gets broadcast and recorded.

use hanabi_live::{
    EndCondition, GameCommand, GameStatus,
    game::Clue,
    history::MemoryRecorder,
    table::{
        ManagerConfig, Notification, TableConfig, TableError, TableId, TableManager, TableStatus,
        UserId,
    },
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinSet};

fn manager_with(config: ManagerConfig) -> (Arc<TableManager>, Arc<MemoryRecorder>) {
    let recorder = Arc::new(MemoryRecorder::new());
    let manager = Arc::new(TableManager::new(config, recorder.clone()));
    (manager, recorder)
}

fn manager() -> (Arc<TableManager>, Arc<MemoryRecorder>) {
    manager_with(ManagerConfig::default())
}

fn table_config(name: &str, seed: u64) -> TableConfig {
    TableConfig {
        name: name.to_string(),
        seed: Some(seed),
        ..TableConfig::default()
    }
}

/// Create a table, seat `users` and start the game
async fn started_table(manager: &TableManager, seed: u64, users: &[UserId]) -> TableId {
    let table_id = manager
        .create_table(table_config("game", seed), users[0])
        .await
        .unwrap();
    for user in users {
        manager
            .join_table(table_id, *user, format!("player{user}"))
            .await
            .unwrap();
    }
    manager.start_game(table_id, users[0]).await.unwrap();
    table_id
}

/// Everyone plays their oldest card until the game ends
async fn play_out(manager: &TableManager, table_id: TableId, users: &[UserId]) {
    for _ in 0..500 {
        let state = manager.get_table_state(table_id, None).await.unwrap();
        let game = state.game.expect("game started");
        if game.status != GameStatus::Running {
            return;
        }
        let seat = game.active_player;
        let order = state.hands[seat].cards[0].order;
        manager
            .apply_command(table_id, users[seat], GameCommand::Play { order })
            .await
            .unwrap();
    }
    panic!("game did not finish");
}

async fn next_action(rx: &mut mpsc::Receiver<Notification>) -> Option<u64> {
    loop {
        match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
            Ok(Some(Notification::Action(logged))) => return Some(logged.seq),
            Ok(Some(_)) => continue,
            _ => return None,
        }
    }
}

#[tokio::test]
async fn test_unknown_table_is_not_found() {
    let (manager, _) = manager();
    assert_eq!(
        manager.apply_command(7, 1, GameCommand::DeckPlay).await,
        Err(TableError::NotFound(7))
    );
    assert!(matches!(
        manager.get_table_state(7, None).await,
        Err(TableError::NotFound(7))
    ));
}

#[tokio::test]
async fn test_command_without_game_is_not_applicable() {
    let (manager, _) = manager();
    let table_id = manager
        .create_table(table_config("lobby", 1), 1)
        .await
        .unwrap();
    manager
        .join_table(table_id, 1, "Alice".to_string())
        .await
        .unwrap();

    assert_eq!(
        manager
            .apply_command(table_id, 1, GameCommand::Play { order: 0 })
            .await,
        Err(TableError::NotApplicable)
    );
}

#[tokio::test]
async fn test_rejected_command_is_not_broadcast() {
    let (manager, _) = manager();
    let table_id = started_table(&manager, 3, &[1, 2]).await;
    let (_, mut rx) = manager.subscribe(table_id, None).await.unwrap();

    // Bob is not the active player.
    let result = manager
        .apply_command(table_id, 2, GameCommand::Play { order: 5 })
        .await;
    assert!(matches!(result, Err(TableError::Rejected(_))));
    assert_eq!(next_action(&mut rx).await, None);
}

#[tokio::test]
async fn test_subscribers_see_the_same_sequence() {
    let (manager, _) = manager();
    let users = [1, 2, 3];
    let table_id = started_table(&manager, 11, &users).await;

    let (_, mut first) = manager.subscribe(table_id, None).await.unwrap();
    let (_, mut second) = manager.subscribe(table_id, None).await.unwrap();

    let backlog_len = match first.recv().await {
        Some(Notification::Backlog { actions, .. }) => actions.len() as u64,
        other => panic!("expected backlog, got {other:?}"),
    };

    for _ in 0..4 {
        let state = manager.get_table_state(table_id, None).await.unwrap();
        let game = state.game.unwrap();
        if game.status != GameStatus::Running {
            break;
        }
        let seat = game.active_player;
        let command = if game.clues > 0 {
            // Any clue that touches the next player's hand.
            let target = (seat + 1) % users.len();
            let card = state.hands[target].cards[0].identity.unwrap();
            GameCommand::Clue {
                target,
                clue: Clue::number(card.rank),
            }
        } else {
            GameCommand::Play {
                order: state.hands[seat].cards[0].order,
            }
        };
        manager
            .apply_command(table_id, users[seat], command)
            .await
            .unwrap();
    }

    let mut first_seqs = Vec::new();
    while let Some(seq) = next_action(&mut first).await {
        first_seqs.push(seq);
    }
    let mut second_seqs = Vec::new();
    while let Some(seq) = next_action(&mut second).await {
        second_seqs.push(seq);
    }

    assert!(!first_seqs.is_empty());
    assert_eq!(first_seqs, second_seqs);
    // Dense and continuing from the backlog.
    let expected: Vec<u64> = (backlog_len..backlog_len + first_seqs.len() as u64).collect();
    assert_eq!(first_seqs, expected);
}

#[tokio::test]
async fn test_snapshot_is_idempotent() {
    let (manager, _) = manager();
    let table_id = started_table(&manager, 5, &[1, 2]).await;

    let first = manager.get_table_state(table_id, Some(1)).await.unwrap();
    let second = manager.get_table_state(table_id, Some(1)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        manager.table_summary(table_id).await.unwrap(),
        first.summary
    );
}

#[tokio::test]
async fn test_concurrent_tables_finish_independently() {
    let (manager, recorder) = manager();
    let mut tasks = JoinSet::new();

    for n in 0..8u64 {
        let manager = manager.clone();
        tasks.spawn(async move {
            let users = [n as i64 * 10 + 1, n as i64 * 10 + 2, n as i64 * 10 + 3];
            let table_id = started_table(&manager, n, &users).await;
            play_out(&manager, table_id, &users).await;
            table_id
        });
    }

    let mut finished = Vec::new();
    while let Some(result) = tasks.join_next().await {
        finished.push(result.unwrap());
    }
    assert_eq!(finished.len(), 8);

    for table_id in finished {
        let summary = manager.table_summary(table_id).await.unwrap();
        assert_eq!(summary.status, TableStatus::Finished);
    }
    assert_eq!(recorder.game_count().await, 8);
    assert_eq!(manager.stats().await.finished, 8);
}

#[tokio::test]
async fn test_finished_game_is_recorded_and_replayable() {
    let (manager, recorder) = manager();
    let users = [1, 2];
    let table_id = started_table(&manager, 21, &users).await;
    play_out(&manager, table_id, &users).await;

    let games = recorder.games().await;
    assert_eq!(games.len(), 1);
    let record = &games[0];
    assert_eq!(record.table_id, table_id);
    assert_eq!(record.players.len(), 2);
    assert!(
        record
            .best_score_deltas
            .iter()
            .all(|d| d.previous.is_none())
    );

    let replay_id = manager.create_replay(table_id, 1).await.unwrap();
    let replay = manager.get_table_state(replay_id, None).await.unwrap();
    assert_eq!(replay.summary.status, TableStatus::Replay);
    let game = replay.game.unwrap();
    assert_eq!(game.score, record.score);
    assert_eq!(game.status, GameStatus::Finished(record.end_condition));

    // Moves are refused at a replay table.
    assert_eq!(
        manager
            .apply_command(replay_id, 1, GameCommand::DeckPlay)
            .await,
        Err(TableError::NotApplicable)
    );
}

#[tokio::test]
async fn test_replay_needs_a_finished_game() {
    let (manager, _) = manager();
    let table_id = started_table(&manager, 2, &[1, 2]).await;
    assert_eq!(
        manager.create_replay(table_id, 1).await,
        Err(TableError::NotApplicable)
    );
}

#[tokio::test]
async fn test_idle_table_ends_game_and_closes() {
    let (manager, recorder) = manager_with(ManagerConfig {
        idle_timeout: Duration::from_millis(150),
        ..ManagerConfig::default()
    });
    let table_id = started_table(&manager, 4, &[1, 2]).await;
    let (_, mut rx) = manager.subscribe(table_id, None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    let games = recorder.games().await;
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].end_condition, EndCondition::Idle);

    let mut saw_closed = false;
    while let Ok(notification) = rx.try_recv() {
        if notification == Notification::Closed {
            saw_closed = true;
        }
    }
    assert!(saw_closed);

    assert_eq!(manager.prune_closed().await, 1);
    assert!(manager.get_table(table_id).await.is_none());
}

#[tokio::test]
async fn test_player_clock_runs_out() {
    let (manager, recorder) = manager();
    let mut config = table_config("timed", 8);
    config.options.timed = true;
    config.options.base_time_secs = 1;
    let table_id = manager.create_table(config, 1).await.unwrap();
    manager
        .join_table(table_id, 1, "Alice".to_string())
        .await
        .unwrap();
    manager
        .join_table(table_id, 2, "Bob".to_string())
        .await
        .unwrap();
    manager.start_game(table_id, 1).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let summary = manager.table_summary(table_id).await.unwrap();
    assert_eq!(summary.status, TableStatus::Finished);
    assert_eq!(summary.end_condition, Some(EndCondition::TimeLimit));
    assert_eq!(recorder.game_count().await, 1);
}

#[tokio::test]
async fn test_chat_reaches_spectators() {
    let (manager, _) = manager();
    let table_id = manager
        .create_table(table_config("chatty", 1), 1)
        .await
        .unwrap();
    manager
        .join_table(table_id, 1, "Alice".to_string())
        .await
        .unwrap();
    manager
        .spectate(table_id, 9, "Watcher".to_string())
        .await
        .unwrap();
    let (_, mut rx) = manager.subscribe(table_id, Some(9)).await.unwrap();

    manager
        .send_chat(table_id, 1, "hello".to_string())
        .await
        .unwrap();
    assert_eq!(
        manager.send_chat(table_id, 1, "   ".to_string()).await,
        Err(TableError::InvalidInput(300))
    );
    assert_eq!(
        manager.send_chat(table_id, 5, "hi".to_string()).await,
        Err(TableError::NotAtTable)
    );

    let mut chat = Vec::new();
    while let Ok(Some(notification)) =
        tokio::time::timeout(Duration::from_millis(100), rx.recv()).await
    {
        if let Notification::Chat(message) = notification {
            chat.push(message.message);
        }
    }
    assert_eq!(chat, vec!["hello"]);
}
