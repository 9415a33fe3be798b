use std::{sync::Arc, time::Duration};

use chrono_tz::Tz;
use engine::Engine;
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod feed;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "salvadanaio={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let timezone: Tz = settings
        .app
        .timezone
        .parse()
        .map_err(|err| format!("invalid timezone {}: {err}", settings.app.timezone))?;
    let db = parse_database(&settings.database).await?;
    let engine = Arc::new(
        Engine::builder()
            .database(db)
            .timezone(timezone)
            .build()
            .await?,
    );
    tracing::info!(%timezone, today = %engine.today(), "engine ready");

    let every = Duration::from_secs(settings.scheduler.interval_secs.max(1));
    tasks.spawn(run_scheduler(engine.clone(), every));

    if let Some(splitwise) = settings.splitwise {
        tracing::info!("Found splitwise settings...");
        let source = feed::JsonFeed::new(splitwise.feed);
        let every = Duration::from_secs(splitwise.interval_secs.max(1));
        tasks.spawn(run_splitwise_sync(engine.clone(), source, every));
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
        _ = tasks.join_next() => tracing::warn!("a background task stopped"),
    }
    tasks.shutdown().await;

    Ok(())
}

/// Settles due transactions once at startup and then every `every`.
async fn run_scheduler(engine: Arc<Engine>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        if let Err(err) = engine.process_pending().await {
            tracing::error!("settlement failed: {err}");
        }
    }
}

async fn run_splitwise_sync(engine: Arc<Engine>, source: feed::JsonFeed, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        if let Err(err) = engine.sync_splitwise(&source).await {
            tracing::error!("splitwise sync failed: {err}");
        }
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
