mod config;
mod domain;
mod engine;
mod matcher;
mod monitoring;
mod roster;
mod runner;
mod time;
mod tz_resolver;
mod whatsapp;
mod zones;

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present (no-op when the scheduler injects env)
    let _ = dotenvy::dotenv();

    monitoring::init_tracing();

    let cfg = config::Config::from_env()?;
    info!(?cfg, "boot");

    // Per-contact send failures only show up in the summary; they never fail the run.
    runner::run(cfg).await?;

    Ok(())
}
