//! Processing job lifecycle
//!
//! Every run owns exactly one row in `processing_jobs` and walks it through
//! `pending -> processing -> completed | failed`. Each transition predicates
//! on the expected prior status, so a skipped or revisited state surfaces as
//! `InvalidJobTransition` instead of silently clobbering the record.

use super::error::PipelineError;
use super::types::{JobStatus, ProcessingJob};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Durable state machine for run bookkeeping.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create one job in `pending` and return its id.
    async fn create(&self) -> Result<i64, PipelineError>;

    /// `pending -> processing`, before the batch fetch begins.
    async fn mark_processing(&self, id: i64) -> Result<(), PipelineError>;

    /// `processing -> completed` with run counts and wall-clock duration.
    async fn mark_completed(
        &self,
        id: i64,
        coins_processed: usize,
        alerts_generated: usize,
        duration_ms: u64,
    ) -> Result<(), PipelineError>;

    /// `processing -> failed`, recording the error message verbatim.
    async fn mark_failed(&self, id: i64, error_message: &str) -> Result<(), PipelineError>;

    async fn get(&self, id: i64) -> Result<ProcessingJob, PipelineError>;
}

/// SQLite implementation of `JobStore`.
pub struct SqliteJobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJobStore {
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

    /// Execute a guarded transition and verify exactly one row moved.
    fn transition(
        conn: &Connection,
        id: i64,
        from: JobStatus,
        to: JobStatus,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<(), PipelineError> {
        let updated = conn.execute(sql, params)?;

        if updated == 0 {
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM processing_jobs WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .ok();

            return Err(PipelineError::InvalidJobTransition(format!(
                "job {} cannot move {} -> {} (current status: {})",
                id,
                from,
                to,
                current.as_deref().unwrap_or("missing"),
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self) -> Result<i64, PipelineError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO processing_jobs (status, created_at) VALUES ('pending', ?1)",
            [now],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn mark_processing(&self, id: i64) -> Result<(), PipelineError> {
        let conn = self.conn.lock().unwrap();

        Self::transition(
            &conn,
            id,
            JobStatus::Pending,
            JobStatus::Processing,
            "UPDATE processing_jobs SET status = 'processing' WHERE id = ?1 AND status = 'pending'",
            rusqlite::params![id],
        )
    }

    async fn mark_completed(
        &self,
        id: i64,
        coins_processed: usize,
        alerts_generated: usize,
        duration_ms: u64,
    ) -> Result<(), PipelineError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();

        Self::transition(
            &conn,
            id,
            JobStatus::Processing,
            JobStatus::Completed,
            "UPDATE processing_jobs
             SET status = 'completed', coins_processed = ?2, alerts_generated = ?3,
                 duration_ms = ?4, completed_at = ?5
             WHERE id = ?1 AND status = 'processing'",
            rusqlite::params![
                id,
                coins_processed as i64,
                alerts_generated as i64,
                duration_ms as i64,
                now
            ],
        )
    }

    async fn mark_failed(&self, id: i64, error_message: &str) -> Result<(), PipelineError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp();

        Self::transition(
            &conn,
            id,
            JobStatus::Processing,
            JobStatus::Failed,
            "UPDATE processing_jobs
             SET status = 'failed', error_message = ?2, completed_at = ?3
             WHERE id = ?1 AND status = 'processing'",
            rusqlite::params![id, error_message, now],
        )
    }

    async fn get(&self, id: i64) -> Result<ProcessingJob, PipelineError> {
        let conn = self.conn.lock().unwrap();

        let job = conn.query_row(
            "SELECT id, status, coins_processed, alerts_generated, duration_ms,
                    error_message, created_at, completed_at
             FROM processing_jobs WHERE id = ?1",
            [id],
            |row| {
                let status_str: String = row.get(1)?;
                Ok(ProcessingJob {
                    id: row.get(0)?,
                    status: JobStatus::parse(&status_str).unwrap_or(JobStatus::Failed),
                    coins_processed: row.get(2)?,
                    alerts_generated: row.get(3)?,
                    duration_ms: row.get(4)?,
                    error_message: row.get(5)?,
                    created_at: row.get(6)?,
                    completed_at: row.get(7)?,
                })
            },
        )?;

        Ok(job)
    }
}
