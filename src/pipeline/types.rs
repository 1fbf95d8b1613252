//! Core data structures for the sentiment pipeline
//!
//! Three families of types:
//! - Provider snapshots (`CoinMetric`) - transient, one per symbol per fetch
//! - History rows (`SentimentRecord`, `NewObservation`) - append-only storage
//! - Run bookkeeping (`TriggerEvent`, `SentimentAlert`, `ProcessingJob`,
//!   `RunSummary`)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical per-symbol snapshot produced by the metrics adapter.
///
/// Both upstream shapes (bulk listing and per-symbol lookup) normalize into
/// this one type. Fields absent from the per-symbol endpoint are synthesized
/// as zero during normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinMetric {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub sentiment: f64,
    #[serde(default)]
    pub interactions_24h: f64,
    #[serde(default)]
    pub social_volume_24h: f64,
    #[serde(default)]
    pub social_dominance: f64,
    pub percent_change_24h: f64,
    pub galaxy_score: f64,
    pub alt_rank: i64,
    pub market_cap: f64,
    #[serde(default)]
    pub last_updated_price: f64,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

/// One persisted historical observation for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub id: i64,
    pub symbol: String,
    pub sentiment: f64,
    pub price: f64,
    pub interactions_24h: f64,
    pub percent_change_24h: f64,
    pub galaxy_score: f64,
    /// Unix seconds, stamped by the store at insert time.
    pub created_at: i64,
}

/// Unsaved projection of a `CoinMetric` headed for the history table.
#[derive(Debug, Clone)]
pub struct NewObservation {
    pub symbol: String,
    pub sentiment: f64,
    pub price: f64,
    pub interactions_24h: f64,
    pub percent_change_24h: f64,
    pub galaxy_score: f64,
}

impl From<&CoinMetric> for NewObservation {
    fn from(coin: &CoinMetric) -> Self {
        Self {
            symbol: coin.symbol.clone(),
            sentiment: coin.sentiment,
            price: coin.price,
            interactions_24h: coin.interactions_24h,
            percent_change_24h: coin.percent_change_24h,
            galaxy_score: coin.galaxy_score,
        }
    }
}

/// Classification of a sentiment movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Spike,
    Drop,
    Normal,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Spike => "spike",
            ChangeType::Drop => "drop",
            ChangeType::Normal => "normal",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            ChangeType::Drop => "\u{1F4C9}",
            _ => "\u{1F4C8}",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert produced for one qualifying symbol in one run. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAlert {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub sentiment: f64,
    #[serde(rename = "previousSentiment", skip_serializing_if = "Option::is_none")]
    pub previous_sentiment: Option<f64>,
    #[serde(rename = "changeType")]
    pub change_type: ChangeType,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub message: String,
    pub price: f64,
    #[serde(rename = "percentChange24h")]
    pub percent_change_24h: f64,
}

/// What caused a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Scheduled,
    Manual,
}

/// Ingress event carried by every trigger (schedule tick or manual POST).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(rename = "checkType")]
    pub check_type: CheckType,
    /// Absent means "use the default monitored set".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins: Option<Vec<String>>,
}

impl TriggerEvent {
    pub fn new(check_type: CheckType, coins: Option<Vec<String>>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            check_type,
            coins,
        }
    }
}

/// Job record status. `Pending` is the only initial state; `Completed` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable bookkeeping row for one processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: i64,
    pub status: JobStatus,
    pub coins_processed: i64,
    pub alerts_generated: i64,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Condensed alert view returned to the caller of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummary {
    pub symbol: String,
    pub sentiment: f64,
    #[serde(rename = "changeType")]
    pub change_type: ChangeType,
    pub message: String,
}

/// Outcome of one end-to-end processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub success: bool,
    #[serde(rename = "coinsProcessed")]
    pub coins_processed: usize,
    #[serde(rename = "alertsGenerated")]
    pub alerts_generated: usize,
    pub duration: u64,
    pub alerts: Vec<AlertSummary>,
}
