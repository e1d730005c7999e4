//! Bounded exponential backoff for progress commits.
//!
//! Only transient repository failures are retried. A version conflict means
//! another writer got there first, and replaying the same commit cannot
//! succeed, so it surfaces immediately.

use std::future::Future;
use std::time::Duration;

use skillpath_types::config::CommitRetryConfig;
use skillpath_types::error::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for CommitRetryPolicy {
    fn default() -> Self {
        Self::from(&CommitRetryConfig::default())
    }
}

impl From<&CommitRetryConfig> for CommitRetryPolicy {
    fn from(config: &CommitRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl CommitRetryPolicy {
    /// No retries, no sleeping. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// `attempt` is 1-based (first execution is attempt 1).
    pub fn should_retry(&self, attempt: u32, error: &RepositoryError) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }

    /// Delay before the attempt following `attempt`: doubles each time,
    /// capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, &err) => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "commit failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = CommitRetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(300),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(50));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(300));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry_only_transient() {
        let policy = CommitRetryPolicy::immediate(3);
        assert!(policy.should_retry(1, &RepositoryError::Connection));
        assert!(policy.should_retry(2, &RepositoryError::Query("busy".into())));
        assert!(!policy.should_retry(3, &RepositoryError::Connection));
        assert!(!policy.should_retry(1, &RepositoryError::Conflict("version".into())));
    }

    #[test]
    fn test_from_config() {
        let policy = CommitRetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(50));
        assert_eq!(policy.max_backoff, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_recovers_from_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = CommitRetryPolicy::immediate(3)
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RepositoryError::Connection)
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = CommitRetryPolicy::immediate(3)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::Connection)
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Connection)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_conflict() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = CommitRetryPolicy::immediate(3)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::Conflict("stale version".into()))
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
