//! Multi-table host for the cooperative card game engine.
//!
//! Spawns lobby tables managed by a `TableManager`, logs what they do and
//! records every finished game until Ctrl+C.

mod config;
mod logging;
mod recorder;

use std::{path::PathBuf, sync::Arc};

use anyhow::Error;
use log::info;
use pico_args::Arguments;

use hanabi_live::TableManager;

use crate::{config::ServerConfig, recorder::JsonRecorder};

const HELP: &str = "\
Host cooperative card game tables

USAGE:
  hl_server [OPTIONS]

OPTIONS:
  --tables      N          Number of tables to create  [default: env NUM_TABLES or 1]
  --record-dir  DIR        Write finished games here as JSON  [default: env RECORD_DIR]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  IDLE_GAME_TIMEOUT_SECS   Close tables with no activity for this long
  TABLE_MAX_PLAYERS        Seats per table (2-6)
  DEFAULT_VARIANT          Variant for lobby tables
  RUST_LOG                 Log filter (e.g. info,hanabi_live=debug)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let num_tables: Option<usize> = pargs.opt_value_from_str("--tables")?;
    let record_dir: Option<PathBuf> = pargs.opt_value_from_str("--record-dir")?;

    logging::init();

    let config = ServerConfig::from_env(num_tables, record_dir);
    config.validate()?;
    info!("Starting table server with {:?}", config.manager);

    let recorder = Arc::new(JsonRecorder::new(config.record_dir.clone()));
    let table_manager = Arc::new(TableManager::new(config.manager, recorder.clone()));

    info!("Creating {} initial table(s)...", config.num_tables);
    for i in 1..=config.num_tables {
        match table_manager
            .create_table(config.table_defaults.table_config(i), 0)
            .await
        {
            Ok(table_id) => info!("Created table {} with ID {}", i, table_id),
            Err(e) => log::error!("Failed to create table {}: {}", i, e),
        }
    }

    info!("Active tables:");
    for table in table_manager.list_tables().await {
        info!(
            "  - {} (ID: {}) - {}/{} players, {}",
            table.name,
            table.id,
            table.players.len(),
            table.max_players,
            table.variant
        );
    }

    info!("Server is running. Press Ctrl+C to stop.");

    let mut stats_tick = tokio::time::interval(config.stats_interval);
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = stats_tick.tick() => {
                let pruned = table_manager.prune_closed().await;
                let stats = table_manager.stats().await;
                tracing::info!(
                    waiting = stats.waiting,
                    running = stats.running,
                    finished = stats.finished,
                    replays = stats.replays,
                    pruned = pruned,
                    "Table stats"
                );
            }
        }
    }

    info!("Shutting down server...");
    table_manager.shutdown().await;
    info!("Recorded {} game(s) this session", recorder.game_count().await);

    Ok(())
}
