//! Manual trigger API
//!
//! `POST /api/trigger` with an optional `{"coins": ["BTC", ...]}` body
//! enqueues exactly one processing run and returns its event id. A worker
//! task drains the queue sequentially, so manually triggered runs never
//! overlap each other.
//!
//! Usage:
//!   cargo run --release --bin trigger_server

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dotenv::dotenv;
use log::{error, info};
use sentiflow::config::AppConfig;
use sentiflow::pipeline::{CheckType, TriggerEvent};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct TriggerRequest {
    coins: Option<Vec<String>>,
}

#[derive(Clone)]
struct AppState {
    tx: mpsc::Sender<TriggerEvent>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Starting Sentiflow trigger server...");

    let config = AppConfig::from_env()?;
    let engine = Arc::new(sentiflow::build_engine(&config)?);

    let (tx, mut rx) = mpsc::channel::<TriggerEvent>(64);

    // Worker drains the queue one event at a time
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match engine.run(&event).await {
                Ok(summary) => {
                    info!(
                        "✅ Queued run finished: {} coins, {} alerts, {}ms",
                        summary.coins_processed, summary.alerts_generated, summary.duration
                    );
                }
                Err(e) => {
                    error!("❌ Queued run failed: {}", e);
                }
            }
        }
    });

    let app = Router::new()
        .route("/api/trigger", post(trigger).get(describe))
        .route("/health", get(|| async { "OK" }))
        .with_state(AppState { tx });

    let listener = tokio::net::TcpListener::bind(&config.trigger_bind_addr).await?;
    info!("✅ Trigger server listening on {}", config.trigger_bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn trigger(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    info!("🚀 Trigger API called, requested coins: {:?}", request.coins);

    let coins = request.coins.filter(|coins| !coins.is_empty());
    let event = TriggerEvent::new(CheckType::Manual, coins);
    let event_id = Uuid::new_v4();

    match state.tx.send(event).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "eventId": event_id,
                "message": "Sentiment processing job queued successfully",
            })),
        ),
        Err(e) => {
            error!("❌ Failed to queue processing job: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to queue processing job",
                })),
            )
        }
    }
}

async fn describe() -> Json<serde_json::Value> {
    Json(json!({
        "status": "Sentiment Processing API",
        "endpoints": {
            "POST": "Queue a new sentiment processing job",
        },
    }))
}
