//! Football warehouse ingestion.
//!
//! Pulls leagues, teams, players, fixtures, standings, injuries and odds from
//! API-Football, head-to-head odds from The Odds API and fixtures from
//! OpenLigaDB, and upserts everything into one SQLite file.

use anyhow::Result;
use tracing::{error, info};

use football_warehouse::{ingest, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("football_warehouse=info".parse()?),
        )
        .init();

    info!("Football warehouse ingestion v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        db = %config.db_path.display(),
        leagues = config.leagues.len(),
        seasons = ?config.seasons,
        endpoints = ?config.endpoints,
        "Loaded configuration"
    );

    let summary = ingest::run(&config).await?;
    for (table, rows) in &summary.rows_by_table {
        info!("{}: {} rows upserted", table, rows);
    }
    for failed in &summary.failed {
        error!(
            "Failed: [{}] {} {} ({}): {}",
            failed.source, failed.endpoint, failed.scope, failed.kind, failed.error
        );
    }
    info!(
        "Run {} complete: {} succeeded, {} failed",
        summary.run_id,
        summary.succeeded,
        summary.failed.len()
    );
    Ok(())
}
