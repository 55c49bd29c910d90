//! Retry policy for upstream calls.

use std::time::Duration;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed {
        delay: Duration,
    },
    /// Delay grows linearly with the attempt number: `base * (attempt + 1)`,
    /// capped at `max`. Matches the upstream API's documented throttling
    /// expectations better than exponential growth for short attempt budgets.
    Linear {
        base: Duration,
        max: Duration,
        /// Apply random jitter (+/- 25%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            base: Duration::from_millis(800),
            max: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay for a given retry attempt (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { base, max, jitter } => {
                let scaled = base.as_secs_f64() * f64::from(attempt + 1);
                let capped = scaled.min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(capped);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.25) as u64;
                    if jitter_ms > 0 {
                        let offset = fastrand::u64(0..=(jitter_ms * 2)) as i64 - jitter_ms as i64;
                        let total = delay.as_millis() as i64 + offset;
                        delay = Duration::from_millis(total.max(0) as u64);
                    }
                }

                delay
            }
        }
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// HTTP status codes that trigger a retry.
    pub retry_on_status: Vec<u16>,
    /// Whether network-level failures (timeout, connect) trigger a retry.
    pub retry_on_transport: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            retry_on_status: vec![429, 500, 502, 503, 504],
            retry_on_transport: true,
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(5), Duration::from_millis(100));
    }

    #[test]
    fn linear_backoff_scales_with_attempt_and_caps() {
        let backoff = Backoff::Linear {
            base: Duration::from_millis(800),
            max: Duration::from_secs(2),
            jitter: false,
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(800));
        assert_eq!(backoff.delay(1), Duration::from_millis(1600));
        assert_eq!(backoff.delay(2), Duration::from_secs(2)); // capped
        assert_eq!(backoff.delay(9), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let backoff = Backoff::Linear {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(10),
            jitter: true,
        };
        for _ in 0..20 {
            let delay_ms = backoff.delay(0).as_millis() as f64;
            assert!((740.0..=1260.0).contains(&delay_ms), "delay_ms={delay_ms}");
        }
    }

    #[test]
    fn default_config_retries_throttling_and_server_errors() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        for status in [429, 500, 502, 503, 504] {
            assert!(config.should_retry_status(status), "status {status}");
        }
        assert!(!config.should_retry_status(404));
        assert!(!config.should_retry_status(401));
        assert!(config.retry_on_transport);
    }

    #[test]
    fn no_retry_config_has_zero_budget() {
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
    }
}
