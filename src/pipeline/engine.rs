//! Processing run orchestration
//!
//! One `run` per trigger event:
//!
//! ```text
//! TriggerEvent
//!     ↓
//! JobStore::create (pending) → mark_processing
//!     ↓
//! MetricsSource::coins_with_sentiment     [fatal on failure]
//!     ↓
//! reconcile_batch                          [per-symbol degradation]
//!     ↓
//! AlertSink::notify (if alerts non-empty)  [never fatal]
//!     ↓
//! JobStore::mark_completed (counts, duration)
//! ```
//!
//! A batch-fetch failure is the only fatal path: the job record moves to
//! `failed` with the adapter error captured verbatim, and the error
//! propagates to the caller.

use super::classifier::ChangeProfile;
use super::error::PipelineError;
use super::history::HistoryStore;
use super::jobs::JobStore;
use super::lunarcrush::MetricsSource;
use super::notifier::AlertSink;
use super::reconciler::reconcile_batch;
use super::types::{AlertSummary, RunSummary, TriggerEvent};
use crate::constants::{MAX_COINS_TO_PROCESS, MONITORED_COINS};
use std::sync::Arc;
use std::time::Instant;

pub struct ProcessingEngine {
    source: Arc<dyn MetricsSource>,
    history: Arc<dyn HistoryStore>,
    jobs: Arc<dyn JobStore>,
    sink: Option<Arc<dyn AlertSink>>,
    profile: ChangeProfile,
    lookback: chrono::Duration,
    max_concurrency: usize,
}

impl ProcessingEngine {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        history: Arc<dyn HistoryStore>,
        jobs: Arc<dyn JobStore>,
        sink: Option<Arc<dyn AlertSink>>,
        profile: ChangeProfile,
        lookback: chrono::Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            source,
            history,
            jobs,
            sink,
            profile,
            lookback,
            max_concurrency,
        }
    }

    /// Execute one end-to-end processing run.
    pub async fn run(&self, event: &TriggerEvent) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();

        let job_id = self.jobs.create().await?;
        self.jobs.mark_processing(job_id).await?;

        let symbols: Vec<String> = match &event.coins {
            Some(coins) if !coins.is_empty() => coins.clone(),
            _ => MONITORED_COINS.iter().map(|s| s.to_string()).collect(),
        };

        log::info!(
            "🚀 Processing run started (job {}, {:?}, {} symbols)",
            job_id,
            event.check_type,
            symbols.len()
        );

        let mut batch = match self.source.coins_with_sentiment(Some(&symbols)).await {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("❌ Batch fetch failed, run aborted: {}", e);
                if let Err(update_err) = self.jobs.mark_failed(job_id, &e.to_string()).await {
                    log::error!("❌ Could not record job failure: {}", update_err);
                }
                return Err(e);
            }
        };
        batch.truncate(MAX_COINS_TO_PROCESS);

        log::info!("📋 Fetched {} coins with sentiment", batch.len());

        let alerts = reconcile_batch(
            self.history.clone(),
            &batch,
            self.profile,
            self.lookback,
            self.max_concurrency,
        )
        .await;

        if !alerts.is_empty() {
            match &self.sink {
                Some(sink) => {
                    // Outcome observed for logging only - a failed or slow
                    // notification never fails the run
                    if let Err(e) = sink.notify(&alerts).await {
                        log::error!("❌ {}", e);
                    }
                }
                None => {
                    log::debug!("No notification sink configured, skipping alert fan-out");
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        self.jobs
            .mark_completed(job_id, batch.len(), alerts.len(), duration_ms)
            .await?;

        log::info!(
            "✅ Job {} completed: {} coins, {} alerts, {}ms",
            job_id,
            batch.len(),
            alerts.len(),
            duration_ms
        );

        Ok(RunSummary {
            success: true,
            coins_processed: batch.len(),
            alerts_generated: alerts.len(),
            duration: duration_ms,
            alerts: alerts
                .iter()
                .map(|alert| AlertSummary {
                    symbol: alert.symbol.clone(),
                    sentiment: alert.sentiment,
                    change_type: alert.change_type,
                    message: alert.message.clone(),
                })
                .collect(),
        })
    }
}
