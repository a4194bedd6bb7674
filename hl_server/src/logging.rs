//! Structured logging configuration.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels come from the `RUST_LOG` env var and default to `info`. Records
/// from the engine's `log` macros go through the same subscriber.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a finished game with structured fields
pub fn log_finished_game(table_id: i64, variant: &str, score: u32, end_condition: &str) {
    tracing::info!(
        table_id = table_id,
        variant = variant,
        score = score,
        end_condition = end_condition,
        "Game finished"
    );
}
