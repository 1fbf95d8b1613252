//! Integration tests for the end-to-end processing run
//!
//! Exercises the real SQLite stores (tempfile databases with the shipped
//! schema) behind a fake metrics source, verifying the full
//! fetch → reconcile → notify → finalize flow and the job record it leaves
//! behind.

#[cfg(test)]
mod processing_run_tests {
    use async_trait::async_trait;
    use rusqlite::Connection;
    use sentiflow::pipeline::{
        run_schema_migrations, AlertSink, ChangeProfile, ChangeType, CheckType, CoinMetric,
        HistoryStore, JobStatus, JobStore, MetricsSource, PipelineError, ProcessingEngine,
        SentimentAlert, SqliteHistoryStore, SqliteJobStore, TriggerEvent,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    /// Metrics source that replays a scripted sequence of batches.
    struct ScriptedSource {
        batches: Mutex<Vec<Result<Vec<CoinMetric>, PipelineError>>>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Result<Vec<CoinMetric>, PipelineError>>) -> Self {
            Self {
                batches: Mutex::new(batches),
            }
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        async fn coins_with_sentiment(
            &self,
            _symbols: Option<&[String]>,
        ) -> Result<Vec<CoinMetric>, PipelineError> {
            let mut batches = self.batches.lock().unwrap();
            assert!(!batches.is_empty(), "source called more times than scripted");
            batches.remove(0)
        }
    }

    struct CountingSink {
        invocations: AtomicUsize,
        last_alerts: Mutex<Vec<SentimentAlert>>,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                invocations: AtomicUsize::new(0),
                last_alerts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AlertSink for CountingSink {
        async fn notify(&self, alerts: &[SentimentAlert]) -> Result<(), PipelineError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            *self.last_alerts.lock().unwrap() = alerts.to_vec();
            Ok(())
        }
    }

    fn make_coin(symbol: &str, sentiment: f64) -> CoinMetric {
        CoinMetric {
            id: 1,
            symbol: symbol.to_string(),
            name: format!("{} Coin", symbol),
            price: 42.0,
            sentiment,
            interactions_24h: 9_000.0,
            social_volume_24h: 100.0,
            social_dominance: 1.0,
            percent_change_24h: 3.0,
            galaxy_score: 66.0,
            alt_rank: 7,
            market_cap: 5e10,
            last_updated_price: 0.0,
            topic: None,
            logo: None,
        }
    }

    /// Fresh database with the shipped schema, plus both stores over it.
    fn stores() -> (NamedTempFile, Arc<SqliteHistoryStore>, Arc<SqliteJobStore>) {
        let db_file = NamedTempFile::new().unwrap();
        let db_path = db_file.path().to_str().unwrap().to_string();

        let mut conn = Connection::open(&db_path).unwrap();
        run_schema_migrations(&mut conn, "sql").unwrap();
        drop(conn);

        let history = Arc::new(SqliteHistoryStore::new(&db_path).unwrap());
        let jobs = Arc::new(SqliteJobStore::new(&db_path).unwrap());
        (db_file, history, jobs)
    }

    fn engine(
        source: Arc<dyn MetricsSource>,
        history: Arc<SqliteHistoryStore>,
        jobs: Arc<SqliteJobStore>,
        sink: Option<Arc<dyn AlertSink>>,
        profile: ChangeProfile,
    ) -> ProcessingEngine {
        ProcessingEngine::new(
            source,
            history,
            jobs,
            sink,
            profile,
            chrono::Duration::hours(24),
            4,
        )
    }

    #[tokio::test]
    async fn test_first_sighting_spike_end_to_end() {
        let (_db, history, jobs) = stores();
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![make_coin("BTC", 90.0)])]));
        let sink = Arc::new(CountingSink::new());

        let engine = engine(
            source,
            history.clone(),
            jobs.clone(),
            Some(sink.clone()),
            ChangeProfile::production(),
        );

        let event = TriggerEvent::new(CheckType::Manual, Some(vec!["BTC".to_string()]));
        let summary = engine.run(&event).await.unwrap();

        // 1. Run outcome
        assert!(summary.success);
        assert_eq!(summary.coins_processed, 1);
        assert_eq!(summary.alerts_generated, 1);
        assert_eq!(summary.alerts[0].change_type, ChangeType::Spike);

        // 2. Observation persisted for BTC
        let records = history.recent("BTC", 0).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sentiment, 90.0);
        assert_eq!(records[0].price, 42.0);

        // 3. Alert reached the sink with no previous sentiment
        assert_eq!(sink.invocations.load(Ordering::SeqCst), 1);
        {
            let alerts = sink.last_alerts.lock().unwrap();
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].previous_sentiment, None);
            assert!(alerts[0].message.contains("first analysis"));
        }

        // 4. Job record completed with counts
        let job = jobs.get(1).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.coins_processed, 1);
        assert_eq!(job.alerts_generated, 1);
        assert!(job.duration_ms.is_some());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_second_run_compares_against_stored_history() {
        let (_db, history, jobs) = stores();
        // Run 1 stores 64; run 2 arrives at 80 (a 25% rise onto the 80 band)
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![make_coin("ETH", 64.0)]),
            Ok(vec![make_coin("ETH", 80.0)]),
        ]));
        let sink = Arc::new(CountingSink::new());

        let engine = engine(
            source,
            history.clone(),
            jobs.clone(),
            Some(sink.clone()),
            ChangeProfile::manual(),
        );

        let event = TriggerEvent::new(CheckType::Scheduled, None);
        let first = engine.run(&event).await.unwrap();
        assert_eq!(first.alerts_generated, 0); // 64 is not a first-sighting extreme

        let second = engine.run(&event).await.unwrap();
        assert_eq!(second.alerts_generated, 1);

        {
            let alerts = sink.last_alerts.lock().unwrap();
            assert_eq!(alerts[0].previous_sentiment, Some(64.0));
            assert_eq!(alerts[0].change_type, ChangeType::Spike);
            assert!(alerts[0].message.contains("+16.0 from 64"));
        }

        // History grew strictly: one row per run
        assert_eq!(history.recent("ETH", 0).await.unwrap().len(), 2);

        // Two independent job records, both completed
        assert_eq!(jobs.get(1).await.unwrap().status, JobStatus::Completed);
        assert_eq!(jobs.get(2).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_profiles_diverge_on_the_same_move() {
        // A 12.5% rise to 72: qualifies under production (70 band),
        // not under manual (20% threshold, 80 band)
        for (profile, expected_alerts) in [
            (ChangeProfile::production(), 1usize),
            (ChangeProfile::manual(), 0usize),
        ] {
            let (_db, history, jobs) = stores();
            let source = Arc::new(ScriptedSource::new(vec![
                Ok(vec![make_coin("SOL", 64.0)]),
                Ok(vec![make_coin("SOL", 72.0)]),
            ]));

            let engine = engine(source, history, jobs, None, profile);

            let event = TriggerEvent::new(CheckType::Scheduled, None);
            engine.run(&event).await.unwrap();
            let summary = engine.run(&event).await.unwrap();

            assert_eq!(summary.alerts_generated, expected_alerts);
        }
    }

    #[tokio::test]
    async fn test_whole_run_fetch_failure_is_recorded() {
        let (_db, history, jobs) = stores();
        let source = Arc::new(ScriptedSource::new(vec![Err(PipelineError::RateLimited)]));

        let engine = engine(
            source,
            history.clone(),
            jobs.clone(),
            None,
            ChangeProfile::production(),
        );

        let event = TriggerEvent::new(CheckType::Scheduled, None);
        let err = engine.run(&event).await.unwrap_err();
        assert!(matches!(err, PipelineError::RateLimited));

        let job = jobs.get(1).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("rate limit exceeded - upgrade your plan or try again later")
        );

        // Nothing was written to history
        assert!(history.recent("BTC", 0).await.unwrap().is_empty());
    }
}
