//! Bounded retry for transient store writes

use std::thread;
use std::time::Duration;

use rand::Rng;

use super::KeyValueStore;
use crate::config::RetryConfig;
use crate::error::StoreResult;

/// How often and how patiently a write is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): exponential with up to 50% jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.saturating_sub(1).min(10));
        let jitter_ms = (exp.as_millis() as u64) / 2;
        if jitter_ms == 0 {
            return exp;
        }
        exp + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Run `op`, retrying while it fails transiently
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient store failure, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Backend wrapper that retries writes under a [`RetryPolicy`]
pub struct Retrying<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: KeyValueStore> Retrying<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: KeyValueStore> KeyValueStore for Retrying<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.policy.run(key, || self.inner.put(key, value))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.policy.run(key, || self.inner.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::StoreError;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    fn interrupted() -> StoreError {
        StoreError::Io(io::Error::new(io::ErrorKind::Interrupted, "eintr"))
    }

    #[test]
    fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = fast(3).run("users", || {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(interrupted())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = fast(2).run("users", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(interrupted())
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = fast(5).run("users", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::ReadOnly)
        });
        assert!(matches!(result, Err(StoreError::ReadOnly)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_grows() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(10),
        };
        let first = policy.delay_for(1);
        let third = policy.delay_for(3);
        assert!(first >= Duration::from_millis(10) && first <= Duration::from_millis(15));
        assert!(third >= Duration::from_millis(40) && third <= Duration::from_millis(60));
        assert_eq!(RetryPolicy::none().delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_policy_from_config_clamps_attempts() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            base_delay_ms: 5,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(5));
    }
}
