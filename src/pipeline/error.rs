//! Error taxonomy for the processing pipeline
//!
//! Adapter errors (`Unauthorized`, `RateLimited`, `UpstreamUnavailable`,
//! `MalformedResponse`) are fatal to a run only when the whole batch fetch
//! fails. Storage errors inside per-symbol reconciliation degrade that
//! symbol only. `NotificationFailed` is never fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid API key - check your LunarCrush credentials")]
    Unauthorized,

    #[error("rate limit exceeded - upgrade your plan or try again later")]
    RateLimited,

    #[error("LunarCrush API is temporarily unavailable")]
    UpstreamUnavailable,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("notification failed: {0}")]
    NotificationFailed(String),

    #[error("invalid job transition: {0}")]
    InvalidJobTransition(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::StorageUnavailable(err.to_string())
    }
}

impl PipelineError {
    /// Transient provider failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited | PipelineError::UpstreamUnavailable
        )
    }
}
