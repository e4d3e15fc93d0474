//! Dump the durable record store as pretty JSON, for backups.

use std::sync::Arc;

use anyhow::Context;
use hunt_nexus::{
    config::AppConfig,
    dao::{hunt_store::json::JsonHuntStore, puzzle::PuzzleDb},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = JsonHuntStore::open(&config.data_dir)
        .await
        .context("opening record store")?;
    let puzzles = PuzzleDb::new(Arc::new(store));

    let dump = puzzles
        .aggregate_json()
        .await
        .context("aggregating records")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&dump).context("rendering dump")?
    );

    Ok(())
}

/// Configure tracing on stderr; stdout carries only the dump.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
