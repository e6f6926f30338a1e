//! Dispatcher configuration.

use std::time::Duration;

/// Backoff applied to a transaction whose handler hit a transport error.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Delay multiplier between attempts.
    pub multiplier: u32,
    /// Attempts in total, the first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// CID of this node; only transactions addressed to it are handled.
    pub node_cid: String,
    /// Live transactions buffered while catch-up runs.
    pub queue_capacity: usize,
    /// Search page size during catch-up.
    pub page_size: u32,
    /// Most transactions handled during catch-up; `0` means no limit.
    pub catch_up_limit: usize,
    pub retry: RetryPolicy,
    /// How long queued transactions may still drain after shutdown.
    pub drain_grace: Duration,
}

impl DispatcherConfig {
    pub fn new(node_cid: impl Into<String>) -> Self {
        Self {
            node_cid: node_cid.into(),
            queue_capacity: 1000,
            page_size: 5,
            catch_up_limit: 0,
            retry: RetryPolicy::default(),
            drain_grace: Duration::from_secs(2),
        }
    }
}
