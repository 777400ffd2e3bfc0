//! Bounded exponential backoff for transient fetch failures.

use super::ArtifactFetcher;
use super::error::{FetchError, Result};
use crate::cancel::CancellationToken;
use crate::catalog::source::SourceLocation;
use std::time::{Duration, Instant};

/// Granularity at which a backoff sleep polls for cancellation.
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// How many times, and how patiently, a transient failure is retried.
///
/// The delay before attempt `n + 1` is `initial_delay * multiplier^(n - 1)`,
/// capped at `max_delay`.
///
/// # Examples
///
/// ```
/// use formula_installer::fetch::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay_after(1), Duration::from_millis(500));
/// assert_eq!(policy.delay_after(2), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// The default backoff with a different attempt budget.
    ///
    /// A budget of zero is treated as one attempt.
    #[must_use]
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Retry without sleeping between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::with_attempts(max_attempts)
        }
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The pause after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Wraps a fetcher and retries its transient failures.
///
/// Non-transient errors (not found, client status, cancellation, local
/// I/O) are returned on the first occurrence.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F> RetryingFetcher<F> {
    /// Wrap `inner` with `policy`.
    #[must_use]
    pub const fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The active retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<F: ArtifactFetcher> ArtifactFetcher for RetryingFetcher<F> {
    fn fetch(&self, location: &SourceLocation, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let max = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            match self.inner.fetch(location, cancel) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if err.is_transient() && attempt < max => {
                    let delay = self.policy.delay_after(attempt);
                    log::warn!(
                        "attempt {attempt}/{max} for {location} failed: {err}; retrying in {}ms",
                        delay.as_millis()
                    );
                    pause(delay, cancel, location)?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn pause(delay: Duration, cancel: &CancellationToken, location: &SourceLocation) -> Result<()> {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                location: location.to_string(),
            });
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        std::thread::sleep(remaining.min(PAUSE_SLICE));
    }
}
