//! Bounded flood-wait retry budget.
//!
//! Telegram answers over-eager clients with a mandatory wait duration.
//! The server dictates how long to sleep; this policy only bounds how
//! often we are willing to obey before giving up, so a hostile or buggy
//! remote cannot keep the process looping forever.

use std::time::Duration;

use tracing::warn;

/// Default maximum number of flood-wait restarts per operation.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default cumulative wait budget per operation.
const DEFAULT_WAIT_BUDGET: Duration = Duration::from_secs(10 * 60);

/// Tracks flood-wait retries against a fixed budget.
#[derive(Debug)]
pub struct FloodPolicy {
    max_retries: u32,
    wait_budget: Duration,
    retries: u32,
    waited: Duration,
}

impl Default for FloodPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_WAIT_BUDGET)
    }
}

impl FloodPolicy {
    /// Creates a policy with explicit caps.
    #[must_use]
    pub const fn new(max_retries: u32, wait_budget: Duration) -> Self {
        Self {
            max_retries,
            wait_budget,
            retries: 0,
            waited: Duration::ZERO,
        }
    }

    /// Number of retries consumed so far.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Whether a wait of `seconds` still fits the budget.
    #[must_use]
    pub fn admits(&self, seconds: u32) -> bool {
        self.retries < self.max_retries
            && self.waited + Duration::from_secs(u64::from(seconds)) <= self.wait_budget
    }

    /// Records a wait of `seconds` and sleeps for that long.
    ///
    /// Callers must check [`FloodPolicy::admits`] first; an inadmissible
    /// wait is still recorded but not slept, so the loop terminates.
    pub async fn obey(&mut self, seconds: u32) {
        let wait = Duration::from_secs(u64::from(seconds));
        self.retries += 1;
        self.waited += wait;

        warn!(
            "Flood wait: sleeping {}s (retry {}/{})",
            seconds, self.retries, self.max_retries
        );
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_within_budget() {
        let policy = FloodPolicy::new(3, Duration::from_secs(600));
        assert!(policy.admits(60));
        assert!(policy.admits(600));
        assert!(!policy.admits(601));
    }

    #[tokio::test]
    async fn test_retry_cap() {
        let mut policy = FloodPolicy::new(2, Duration::from_secs(600));

        assert!(policy.admits(0));
        policy.obey(0).await;
        assert!(policy.admits(0));
        policy.obey(0).await;

        // Two retries consumed; a third is refused regardless of duration.
        assert!(!policy.admits(0));
        assert_eq!(policy.retries(), 2);
    }

    #[tokio::test]
    async fn test_wait_budget_accumulates() {
        let mut policy = FloodPolicy::new(10, Duration::from_secs(1));

        assert!(policy.admits(1));
        policy.obey(1).await;
        assert!(!policy.admits(1));
    }
}
