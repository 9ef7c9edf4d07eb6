use crate::types::{DEFAULT_RECONNECT_FALLBACK, RECONNECT_INTERVALS};
use std::time::Duration;
use tokio::time::sleep;

/// Reconnect delays for callers that restart a client after it closes.
///
/// The client itself never reconnects; this only paces the caller's retries.
pub struct Backoff {
    attempts: u32,
    intervals: Vec<u64>,
}

impl Backoff {
    pub fn new(intervals: Vec<u64>) -> Self {
        Self {
            attempts: 0,
            intervals,
        }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .intervals
            .get(self.attempts as usize)
            .or(self.intervals.last())
            .copied()
            .unwrap_or(DEFAULT_RECONNECT_FALLBACK);

        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(delay)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Call after a successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Sleeps for the next delay
    pub async fn wait(&mut self) {
        let delay = self.next_delay();
        tracing::debug!("Waiting {:?} before reconnect attempt {}", delay, self.attempts);
        sleep(delay).await;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(RECONNECT_INTERVALS.to_vec())
    }
}
