//! Bounded exponential retry for transient provider failures

use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

impl ExponentialBackoff {
    pub fn new(initial_ms: u64, max_ms: u64, retries: u32) -> Self {
        Self {
            initial_delay_ms: initial_ms,
            max_delay_ms: max_ms,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Sleep for the next backoff interval, doubling each attempt.
    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        if self.current_attempt >= self.max_retries {
            return Err(MaxRetriesExceeded);
        }

        let delay = std::cmp::min(
            self.initial_delay_ms * 2_u64.pow(self.current_attempt),
            self.max_delay_ms,
        );

        log::warn!(
            "⏳ Retry attempt {} of {} in {}ms",
            self.current_attempt + 1,
            self.max_retries,
            delay
        );

        sleep(Duration::from_millis(delay)).await;
        self.current_attempt += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exhausts_after_max_retries() {
        let mut backoff = ExponentialBackoff::new(1, 10, 2);

        assert!(backoff.sleep().await.is_ok());
        assert!(backoff.sleep().await.is_ok());
        assert!(backoff.sleep().await.is_err());
    }

    #[tokio::test]
    async fn test_reset_restores_attempts() {
        let mut backoff = ExponentialBackoff::new(1, 10, 1);

        assert!(backoff.sleep().await.is_ok());
        assert!(backoff.sleep().await.is_err());

        backoff.reset();
        assert!(backoff.sleep().await.is_ok());
    }
}
