//! Runtime configuration
//!
//! Everything environment-derived is read here, once, at startup. The
//! resulting struct is validated and then handed to components explicitly;
//! nothing else in the crate touches the environment.

use crate::constants::{API_TIMEOUT_MS, LUNARCRUSH_BASE_URL};
use crate::pipeline::classifier::ChangeProfile;
use crate::pipeline::error::PipelineError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// LunarCrush API credentials (required).
    pub lunarcrush_api_key: String,

    /// Provider base URL (overridable for staging/testing).
    pub lunarcrush_base_url: String,

    /// Path to the SQLite database file.
    pub db_path: String,

    /// Discord webhook URL; absent disables the notification sink.
    pub discord_webhook_url: Option<String>,

    /// Classification profile name: "production" or "manual".
    pub profile: ChangeProfile,

    /// Seconds between scheduled runs.
    pub check_interval_secs: u64,

    /// Hours of history considered when looking up the previous observation.
    pub lookback_hours: i64,

    /// Concurrent per-symbol reconciliations per run.
    pub max_concurrency: usize,

    /// Outbound HTTP timeout.
    pub api_timeout: Duration,

    /// Bind address for the trigger server.
    pub trigger_bind_addr: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LUNARCRUSH_API_KEY` (required)
    /// - `LUNARCRUSH_BASE_URL` (default: the public API)
    /// - `SENTIFLOW_DB_PATH` (default: sentiflow.db)
    /// - `DISCORD_WEBHOOK_URL` (optional; unset disables notifications)
    /// - `SENTIFLOW_PROFILE` (default: production)
    /// - `CHECK_INTERVAL_SECS` (default: 900)
    /// - `HISTORY_LOOKBACK_HOURS` (default: 24)
    /// - `MAX_CONCURRENCY` (default: 8)
    /// - `TRIGGER_BIND_ADDR` (default: 0.0.0.0:3000)
    pub fn from_env() -> Result<Self, PipelineError> {
        let lunarcrush_api_key = env::var("LUNARCRUSH_API_KEY").map_err(|_| {
            PipelineError::Config("LUNARCRUSH_API_KEY environment variable is required".to_string())
        })?;

        let profile_name =
            env::var("SENTIFLOW_PROFILE").unwrap_or_else(|_| "production".to_string());
        let profile = ChangeProfile::from_name(&profile_name).ok_or_else(|| {
            PipelineError::Config(format!(
                "unknown profile '{}' (expected 'production' or 'manual')",
                profile_name
            ))
        })?;

        let config = Self {
            lunarcrush_api_key,
            lunarcrush_base_url: env::var("LUNARCRUSH_BASE_URL")
                .unwrap_or_else(|_| LUNARCRUSH_BASE_URL.to_string()),

            db_path: env::var("SENTIFLOW_DB_PATH").unwrap_or_else(|_| "sentiflow.db".to_string()),

            discord_webhook_url: env::var("DISCORD_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),

            profile,

            check_interval_secs: env::var("CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(900),

            lookback_hours: env::var("HISTORY_LOOKBACK_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),

            max_concurrency: env::var("MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),

            api_timeout: Duration::from_millis(API_TIMEOUT_MS),

            trigger_bind_addr: env::var("TRIGGER_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.lunarcrush_api_key.is_empty() {
            return Err(PipelineError::Config(
                "LUNARCRUSH_API_KEY must not be empty".to_string(),
            ));
        }
        if self.lookback_hours <= 0 {
            return Err(PipelineError::Config(
                "HISTORY_LOOKBACK_HOURS must be positive".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(PipelineError::Config(
                "MAX_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(PipelineError::Config(
                "CHECK_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        if self.profile.high_band <= self.profile.low_band {
            return Err(PipelineError::Config(
                "profile high band must exceed low band".to_string(),
            ));
        }
        Ok(())
    }
}
