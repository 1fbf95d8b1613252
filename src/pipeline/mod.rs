//! # Sentiment Change-Detection Pipeline
//!
//! Ingests a batch of current per-symbol social metrics, reconciles it
//! against stored history, classifies each change, persists every
//! observation, and fans qualifying alerts out to a webhook.
//!
//! ## Architecture
//!
//! ```text
//! TriggerEvent (schedule tick or manual POST)
//!     ↓
//! ProcessingEngine::run()
//!     ↓
//! LunarCrushClient (bulk listing, dedup by market cap)
//!     ↓
//! reconcile_batch (per symbol: latest → classify → append)
//!     ↓
//! DiscordNotifier (one aggregate embed, best effort)
//!     ↓
//! SqliteJobStore (pending → processing → completed | failed)
//! ```
//!
//! ## Storage
//!
//! Two tables, schema in `/sql/`:
//! - `sentiment_history` - INSERT only (append-only observations)
//! - `processing_jobs` - one row per run, guarded status transitions
//!
//! ## Failure policy
//!
//! A symbol that fails inside reconciliation degrades alone. A failed batch
//! fetch fails the whole run and is recorded on the job record. A failed
//! notification is logged and swallowed, always.
//!
//! ## Module Organization
//!
//! - `types` - Core data structures (CoinMetric, SentimentRecord, alerts)
//! - `error` - Pipeline error taxonomy
//! - `classifier` - Pure spike/drop/normal classification, both profiles
//! - `lunarcrush` - Provider adapter over the two upstream shapes
//! - `history` - Append-only observation store
//! - `jobs` - Processing job lifecycle
//! - `reconciler` - Bounded-concurrency batch reconciliation
//! - `notifier` - Webhook alert fan-out
//! - `engine` - End-to-end run orchestration
//! - `db` - Schema migration loader
//! - `backoff` - Bounded retry for transient provider failures

pub mod backoff;
pub mod classifier;
pub mod db;
pub mod engine;
pub mod error;
pub mod history;
pub mod jobs;
pub mod lunarcrush;
pub mod notifier;
pub mod reconciler;
pub mod types;

// Re-export commonly used types
pub use classifier::{alert_message, classify, ChangeProfile};
pub use db::run_schema_migrations;
pub use engine::ProcessingEngine;
pub use error::PipelineError;
pub use history::{HistoryStore, SqliteHistoryStore};
pub use jobs::{JobStore, SqliteJobStore};
pub use lunarcrush::{LunarCrushClient, MetricsSource};
pub use notifier::{AlertSink, DiscordNotifier};
pub use reconciler::reconcile_batch;
pub use types::{
    AlertSummary, ChangeType, CheckType, CoinMetric, JobStatus, NewObservation, ProcessingJob,
    RunSummary, SentimentAlert, SentimentRecord, TriggerEvent,
};
