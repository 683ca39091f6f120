//! Retry budgets for the Overpass fetcher.

use std::time::Duration;

/// Attempt limit and base backoff for one class of transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Attempts allowed before the budget is exhausted.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl BackoffPolicy {
    /// Construct a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }
}

/// Retry limits for timeouts and rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Budget for HTTP 504 and transport failures.
    pub timeout: BackoffPolicy,
    /// Budget for HTTP 429.
    pub rate_limit: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: BackoffPolicy::new(4, Duration::from_secs(2)),
            rate_limit: BackoffPolicy::new(4, Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Replace the timeout budget.
    #[must_use]
    pub const fn with_timeout(mut self, policy: BackoffPolicy) -> Self {
        self.timeout = policy;
        self
    }

    /// Replace the rate-limit budget.
    #[must_use]
    pub const fn with_rate_limit(mut self, policy: BackoffPolicy) -> Self {
        self.rate_limit = policy;
        self
    }
}

/// Attempts consumed against one [`BackoffPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryBudget {
    policy: BackoffPolicy,
    used: u32,
}

impl RetryBudget {
    pub(crate) const fn new(policy: BackoffPolicy) -> Self {
        Self { policy, used: 0 }
    }

    pub(crate) const fn used(&self) -> u32 {
        self.used
    }

    pub(crate) const fn is_exhausted(&self) -> bool {
        self.used >= self.policy.max_attempts
    }

    /// Record a failure and return the wait before the next attempt.
    ///
    /// The wait is `base_delay * 2^(n - 1)` for the `n`th failure.
    pub(crate) fn consume(&mut self) -> Duration {
        self.used = self.used.saturating_add(1);
        let exponent = self.used.saturating_sub(1).min(16);
        self.policy.base_delay.saturating_mul(1 << exponent)
    }
}

/// Joint state of both budgets across one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryState {
    pub(crate) timeout: RetryBudget,
    pub(crate) rate_limit: RetryBudget,
}

impl RetryState {
    pub(crate) const fn new(policy: RetryPolicy) -> Self {
        Self {
            timeout: RetryBudget::new(policy.timeout),
            rate_limit: RetryBudget::new(policy.rate_limit),
        }
    }

    /// Whether either budget has run out.
    pub(crate) const fn is_exhausted(&self) -> bool {
        self.timeout.is_exhausted() || self.rate_limit.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn backoff_doubles_from_the_base_delay() {
        let mut budget = RetryBudget::new(BackoffPolicy::new(4, Duration::from_secs(2)));

        let waits: Vec<_> = (0..4).map(|_| budget.consume()).collect();

        assert_eq!(
            waits,
            [2, 4, 8, 16].map(Duration::from_secs).to_vec()
        );
        assert!(budget.is_exhausted());
        assert_eq!(budget.used(), 4);
    }

    #[rstest]
    fn either_budget_exhausts_the_state() {
        let mut state = RetryState::new(RetryPolicy::default());
        assert!(!state.is_exhausted());

        for _ in 0..3 {
            state.rate_limit.consume();
        }
        assert!(!state.is_exhausted());
        state.rate_limit.consume();

        assert!(state.is_exhausted());
        assert_eq!(state.timeout.used(), 0);
    }

    #[rstest]
    fn zero_attempt_budget_is_exhausted_immediately() {
        let state = RetryState::new(
            RetryPolicy::default().with_timeout(BackoffPolicy::new(0, Duration::ZERO)),
        );
        assert!(state.is_exhausted());
    }
}
