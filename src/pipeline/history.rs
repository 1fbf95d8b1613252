//! Append-only sentiment history store
//!
//! One row per symbol per processing run in `sentiment_history`. Rows are
//! never updated; "most recent" queries order by `created_at` descending
//! with `id` breaking same-second ties.

use super::error::PipelineError;
use super::types::{NewObservation, SentimentRecord};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Read/write access to historical observations.
///
/// The reconciler only ever needs `latest` (single most recent prior
/// observation inside a window); `recent` serves wider lookups and `clear`
/// is the one sanctioned bulk delete.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one observation. The store stamps `created_at` itself.
    async fn append(&self, observation: &NewObservation) -> Result<(), PipelineError>;

    /// Most recent observation for `symbol` with `created_at >= since`.
    async fn latest(&self, symbol: &str, since: i64)
        -> Result<Option<SentimentRecord>, PipelineError>;

    /// All observations for `symbol` with `created_at >= since`, newest first.
    async fn recent(&self, symbol: &str, since: i64)
        -> Result<Vec<SentimentRecord>, PipelineError>;

    /// Delete every observation. Returns the number of rows removed.
    async fn clear(&self) -> Result<usize, PipelineError>;
}

/// SQLite implementation of `HistoryStore`.
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    /// Open the database at `db_path`. Schema must already exist (the
    /// runtime applies `sql/*.sql` before constructing stores).
    pub fn new(db_path: &str) -> Result<Self, PipelineError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SentimentRecord> {
    Ok(SentimentRecord {
        id: row.get(0)?,
        symbol: row.get(1)?,
        sentiment: row.get(2)?,
        price: row.get(3)?,
        interactions_24h: row.get(4)?,
        percent_change_24h: row.get(5)?,
        galaxy_score: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const RECORD_COLUMNS: &str =
    "id, symbol, sentiment, price, interactions_24h, percent_change_24h, galaxy_score, created_at";

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, observation: &NewObservation) -> Result<(), PipelineError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            r#"
            INSERT INTO sentiment_history
                (symbol, sentiment, price, interactions_24h, percent_change_24h, galaxy_score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            rusqlite::params![
                observation.symbol,
                observation.sentiment,
                observation.price,
                observation.interactions_24h,
                observation.percent_change_24h,
                observation.galaxy_score,
                now,
            ],
        )?;

        Ok(())
    }

    async fn latest(
        &self,
        symbol: &str,
        since: i64,
    ) -> Result<Option<SentimentRecord>, PipelineError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sentiment_history
             WHERE symbol = ?1 AND created_at >= ?2
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))?;

        let mut rows = stmt.query(rusqlite::params![symbol, since])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    async fn recent(
        &self,
        symbol: &str,
        since: i64,
    ) -> Result<Vec<SentimentRecord>, PipelineError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sentiment_history
             WHERE symbol = ?1 AND created_at >= ?2
             ORDER BY created_at DESC, id DESC"
        ))?;

        let records = stmt
            .query_map(rusqlite::params![symbol, since], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    async fn clear(&self) -> Result<usize, PipelineError> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM sentiment_history", [])?;
        log::info!("🧹 Cleared {} sentiment history rows", removed);
        Ok(removed)
    }
}
