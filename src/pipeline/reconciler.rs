//! Batch reconciliation of current metrics against stored history
//!
//! For each symbol in a batch, independently: read the most recent prior
//! observation inside the lookback window, classify the change, persist the
//! new observation unconditionally, and collect an alert when the change is
//! significant. A failing symbol degrades alone - it contributes neither an
//! observation nor an alert, and the batch keeps going.
//!
//! Symbols run concurrently under a semaphore bound; each symbol's three
//! sub-steps (read, classify, write) stay sequential. Results join in spawn
//! order, so the returned alerts preserve batch order.

use super::classifier::{alert_message, classify, ChangeProfile};
use super::history::HistoryStore;
use super::types::{ChangeType, CoinMetric, NewObservation, SentimentAlert};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Reconcile one batch. Never fails as a whole.
pub async fn reconcile_batch(
    history: Arc<dyn HistoryStore>,
    batch: &[CoinMetric],
    profile: ChangeProfile,
    lookback: chrono::Duration,
    max_concurrency: usize,
) -> Vec<SentimentAlert> {
    let since = (chrono::Utc::now() - lookback).timestamp();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    let mut handles = Vec::with_capacity(batch.len());

    for coin in batch.iter().cloned() {
        let history = history.clone();
        let semaphore = semaphore.clone();

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return None;
            };

            match process_coin(&coin, history.as_ref(), &profile, since).await {
                Ok(alert) => alert,
                Err(e) => {
                    log::error!("❌ Error processing {}: {}", coin.symbol, e);
                    None
                }
            }
        }));
    }

    let mut alerts = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some(alert)) => alerts.push(alert),
            Ok(None) => {}
            Err(e) => log::error!("❌ Reconcile task failed: {}", e),
        }
    }

    alerts
}

/// One symbol's read -> classify -> write sequence.
async fn process_coin(
    coin: &CoinMetric,
    history: &dyn HistoryStore,
    profile: &ChangeProfile,
    since: i64,
) -> Result<Option<SentimentAlert>, super::error::PipelineError> {
    let previous = history
        .latest(&coin.symbol, since)
        .await?
        .map(|record| record.sentiment);

    let change_type = classify(coin.sentiment, previous, profile);

    // Every successfully processed symbol leaves an observation behind,
    // significant change or not
    history.append(&NewObservation::from(coin)).await?;

    if change_type == ChangeType::Normal {
        return Ok(None);
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    Ok(Some(SentimentAlert {
        id: format!("{}-{}", coin.symbol, now_ms),
        symbol: coin.symbol.clone(),
        name: coin.name.clone(),
        sentiment: coin.sentiment,
        previous_sentiment: previous,
        change_type,
        timestamp: now_ms,
        message: alert_message(&coin.symbol, coin.sentiment, change_type, previous),
        price: coin.price,
        percent_change_24h: coin.percent_change_24h,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::PipelineError;
    use crate::pipeline::types::SentimentRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory history that can be told to fail reads for one symbol.
    struct MemoryHistory {
        rows: Mutex<Vec<SentimentRecord>>,
        fail_reads_for: Option<String>,
        next_id: Mutex<i64>,
    }

    impl MemoryHistory {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail_reads_for: None,
                next_id: Mutex::new(1),
            }
        }

        fn failing_for(symbol: &str) -> Self {
            Self {
                fail_reads_for: Some(symbol.to_string()),
                ..Self::new()
            }
        }

        fn seed(&self, symbol: &str, sentiment: f64, created_at: i64) {
            let mut id = self.next_id.lock().unwrap();
            self.rows.lock().unwrap().push(SentimentRecord {
                id: *id,
                symbol: symbol.to_string(),
                sentiment,
                price: 1.0,
                interactions_24h: 0.0,
                percent_change_24h: 0.0,
                galaxy_score: 50.0,
                created_at,
            });
            *id += 1;
        }

        fn count_for(&self, symbol: &str) -> usize {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.symbol == symbol)
                .count()
        }
    }

    #[async_trait]
    impl HistoryStore for MemoryHistory {
        async fn append(&self, observation: &NewObservation) -> Result<(), PipelineError> {
            let created_at = chrono::Utc::now().timestamp();
            let mut id = self.next_id.lock().unwrap();
            self.rows.lock().unwrap().push(SentimentRecord {
                id: *id,
                symbol: observation.symbol.clone(),
                sentiment: observation.sentiment,
                price: observation.price,
                interactions_24h: observation.interactions_24h,
                percent_change_24h: observation.percent_change_24h,
                galaxy_score: observation.galaxy_score,
                created_at,
            });
            *id += 1;
            Ok(())
        }

        async fn latest(
            &self,
            symbol: &str,
            since: i64,
        ) -> Result<Option<SentimentRecord>, PipelineError> {
            if self.fail_reads_for.as_deref() == Some(symbol) {
                return Err(PipelineError::StorageUnavailable(
                    "simulated read failure".to_string(),
                ));
            }

            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| r.symbol == symbol && r.created_at >= since)
                .max_by_key(|r| (r.created_at, r.id))
                .cloned())
        }

        async fn recent(
            &self,
            symbol: &str,
            since: i64,
        ) -> Result<Vec<SentimentRecord>, PipelineError> {
            let rows = self.rows.lock().unwrap();
            let mut matched: Vec<SentimentRecord> = rows
                .iter()
                .filter(|r| r.symbol == symbol && r.created_at >= since)
                .cloned()
                .collect();
            matched.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id)));
            Ok(matched)
        }

        async fn clear(&self) -> Result<usize, PipelineError> {
            let mut rows = self.rows.lock().unwrap();
            let removed = rows.len();
            rows.clear();
            Ok(removed)
        }
    }

    fn make_coin(symbol: &str, sentiment: f64) -> CoinMetric {
        CoinMetric {
            id: 1,
            symbol: symbol.to_string(),
            name: format!("{} Coin", symbol),
            price: 10.0,
            sentiment,
            interactions_24h: 100.0,
            social_volume_24h: 0.0,
            social_dominance: 0.0,
            percent_change_24h: 1.0,
            galaxy_score: 55.0,
            alt_rank: 5,
            market_cap: 1e9,
            last_updated_price: 0.0,
            topic: None,
            logo: None,
        }
    }

    #[tokio::test]
    async fn test_one_failing_symbol_degrades_alone() {
        let history = Arc::new(MemoryHistory::failing_for("BAD"));
        let now = chrono::Utc::now().timestamp();
        for symbol in ["A", "B", "C", "D", "BAD"] {
            history.seed(symbol, 50.0, now - 60);
        }

        // All five would spike against a previous of 50
        let batch: Vec<CoinMetric> = ["A", "B", "BAD", "C", "D"]
            .iter()
            .map(|s| make_coin(s, 90.0))
            .collect();

        let alerts = reconcile_batch(
            history.clone(),
            &batch,
            ChangeProfile::manual(),
            chrono::Duration::hours(24),
            4,
        )
        .await;

        // The failing symbol contributes neither an alert nor a write
        assert_eq!(alerts.len(), 4);
        assert!(alerts.iter().all(|a| a.symbol != "BAD"));
        assert_eq!(history.count_for("BAD"), 1); // seed row only
        assert_eq!(history.count_for("A"), 2); // seed + new observation
    }

    #[tokio::test]
    async fn test_observation_persisted_even_when_normal() {
        let history = Arc::new(MemoryHistory::new());

        let batch = vec![make_coin("BTC", 50.0)];
        let alerts = reconcile_batch(
            history.clone(),
            &batch,
            ChangeProfile::manual(),
            chrono::Duration::hours(24),
            4,
        )
        .await;

        assert!(alerts.is_empty());
        assert_eq!(history.count_for("BTC"), 1);
    }

    #[tokio::test]
    async fn test_first_sighting_spike_produces_alert() {
        let history = Arc::new(MemoryHistory::new());

        let batch = vec![make_coin("BTC", 90.0)];
        let alerts = reconcile_batch(
            history.clone(),
            &batch,
            ChangeProfile::production(),
            chrono::Duration::hours(24),
            4,
        )
        .await;

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.change_type, ChangeType::Spike);
        assert_eq!(alert.previous_sentiment, None);
        assert!(alert.message.contains("first analysis"));
        assert_eq!(history.count_for("BTC"), 1);
    }

    #[tokio::test]
    async fn test_comparison_uses_latest_not_earliest() {
        let history = Arc::new(MemoryHistory::new());
        let now = chrono::Utc::now().timestamp();
        // Older extreme value would spike; the latest value must win
        history.seed("BTC", 20.0, now - 3_600);
        history.seed("BTC", 75.0, now - 60);

        let batch = vec![make_coin("BTC", 80.0)];
        let alerts = reconcile_batch(
            history.clone(),
            &batch,
            ChangeProfile::manual(),
            chrono::Duration::hours(24),
            4,
        )
        .await;

        // 80 vs latest 75 is only a 6.7% move - no alert
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_alerts_preserve_batch_order() {
        let history = Arc::new(MemoryHistory::new());

        let batch: Vec<CoinMetric> = ["Z", "M", "A"]
            .iter()
            .map(|s| make_coin(s, 95.0))
            .collect();

        let alerts = reconcile_batch(
            history,
            &batch,
            ChangeProfile::manual(),
            chrono::Duration::hours(24),
            1,
        )
        .await;

        let symbols: Vec<&str> = alerts.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["Z", "M", "A"]);
    }

    #[tokio::test]
    async fn test_alert_carries_previous_and_delta_message() {
        let history = Arc::new(MemoryHistory::new());
        let now = chrono::Utc::now().timestamp();
        history.seed("BTC", 64.0, now - 60);

        let batch = vec![make_coin("BTC", 80.0)];
        let alerts = reconcile_batch(
            history,
            &batch,
            ChangeProfile::manual(),
            chrono::Duration::hours(24),
            4,
        )
        .await;

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.previous_sentiment, Some(64.0));
        assert!(alert.message.contains("+16.0 from 64"));
        assert!(alert.message.contains("+25.0%"));
        assert_eq!(alert.name, "BTC Coin");
    }
}
