pub mod config;
pub mod constants;
pub mod pipeline;

use config::AppConfig;
use dotenv::dotenv;
use log::{error, info};
use pipeline::{
    run_schema_migrations, AlertSink, CheckType, DiscordNotifier, LunarCrushClient, PipelineError,
    ProcessingEngine, SqliteHistoryStore, SqliteJobStore, TriggerEvent,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;

/// Directory of numbered schema files, relative to the working directory.
pub const SCHEMA_DIR: &str = "sql";

/// Assemble a `ProcessingEngine` from validated configuration.
///
/// Opens the database, applies migrations, then wires the concrete
/// components (LunarCrush client, SQLite stores, optional Discord sink)
/// into one engine. Both binaries go through here.
pub fn build_engine(config: &AppConfig) -> Result<ProcessingEngine, PipelineError> {
    let mut conn = Connection::open(&config.db_path)?;
    run_schema_migrations(&mut conn, SCHEMA_DIR)?;
    drop(conn); // Close temporary connection

    let source = Arc::new(LunarCrushClient::new(
        &config.lunarcrush_base_url,
        &config.lunarcrush_api_key,
        config.api_timeout,
    )?);
    let history = Arc::new(SqliteHistoryStore::new(&config.db_path)?);
    let jobs = Arc::new(SqliteJobStore::new(&config.db_path)?);

    let sink: Option<Arc<dyn AlertSink>> = match &config.discord_webhook_url {
        Some(url) => Some(Arc::new(DiscordNotifier::new(url, config.api_timeout)?)),
        None => None,
    };

    Ok(ProcessingEngine::new(
        source,
        history,
        jobs,
        sink,
        config.profile,
        chrono::Duration::hours(config.lookback_hours),
        config.max_concurrency,
    ))
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Starting Sentiflow scheduled runtime...");

    let config = AppConfig::from_env()?;

    info!("📊 Configuration:");
    info!("   Database: {}", config.db_path);
    info!(
        "   Profile: {:.0}% threshold, {}/{} bands",
        config.profile.threshold * 100.0,
        config.profile.high_band,
        config.profile.low_band
    );
    info!("   Check interval: {}s", config.check_interval_secs);
    info!("   Lookback window: {}h", config.lookback_hours);
    info!(
        "   Discord webhook: {}",
        if config.discord_webhook_url.is_some() {
            "configured"
        } else {
            "disabled"
        }
    );

    let engine = build_engine(&config)?;
    info!("✅ Pipeline engine ready");

    let mut timer = tokio::time::interval(Duration::from_secs(config.check_interval_secs));

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let event = TriggerEvent::new(CheckType::Scheduled, None);
                match engine.run(&event).await {
                    Ok(summary) => {
                        info!(
                            "✅ Scheduled run finished: {} coins, {} alerts, {}ms",
                            summary.coins_processed, summary.alerts_generated, summary.duration
                        );
                    }
                    Err(e) => {
                        // Already recorded on the job record; keep ticking
                        error!("❌ Scheduled run failed: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("⚠️  Received CTRL+C, shutting down...");
                break;
            }
        }
    }

    info!("✅ Sentiflow runtime stopped");
    Ok(())
}
