//! Retry a predicate on a fixed tick until it holds or a deadline passes.
//!
//! [`poll_until`] is the primitive the rest of the crate is built on. The
//! predicate decides what "not yet" means: it returns `Ok(false)` to keep
//! polling and `Err` to abort. Transient remote errors must be absorbed by
//! the predicate itself (see [`ProviderError::is_transient`]); the poller
//! never retries an error.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use hemmer_provider_convergence::poll::{poll_until, PollOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let calls = &AtomicUsize::new(0);
//! let options = PollOptions::new()
//!     .with_interval(Duration::from_millis(1))
//!     .with_timeout(Duration::from_secs(5));
//!
//! poll_until("counter reaches 3", &options, || async move {
//!     Ok(calls.fetch_add(1, Ordering::SeqCst) + 1 >= 3)
//! })
//! .await
//! .unwrap();
//!
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, instrument, trace};

use crate::error::ProviderError;

/// Default delay between predicate evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on the total time spent polling.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Interval and timeout for a single [`poll_until`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between predicate evaluations. The first evaluation happens one
    /// interval after the poll starts.
    pub interval: Duration,
    /// Total wall-clock budget for the poll.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollOptions {
    /// Create poll options with the default 5 second interval and 5 minute timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interval between predicate evaluations.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the total timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that both durations are positive.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.interval.is_zero() {
            return Err(ProviderError::Configuration(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProviderError::Configuration(
                "poll timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Evaluate `predicate` once per interval until it returns `Ok(true)`.
///
/// - `Ok(true)` ends the poll successfully; no further ticks happen.
/// - `Ok(false)` waits for the next tick.
/// - `Err(e)` is returned immediately, without another evaluation.
/// - If `options.timeout` elapses first, a [`ProviderError::Timeout`] naming
///   `operation` and the configured timeout is returned, and the in-flight
///   predicate future (if any) is dropped.
///
/// Evaluations are strictly sequential: the next tick is not awaited until
/// the current predicate future has resolved, and ticks missed while a slow
/// predicate ran are not replayed.
///
/// A predicate that completes at the same instant the deadline fires may be
/// reported either way, depending on which the runtime polls first.
#[instrument(skip_all, fields(operation = %operation))]
pub async fn poll_until<F, Fut>(
    operation: &str,
    options: &PollOptions,
    mut predicate: F,
) -> Result<(), ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ProviderError>>,
{
    options.validate()?;

    let mut ticker = interval_at(Instant::now() + options.interval, options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(ticker);

    let poll = async {
        let mut attempt: u32 = 0;
        while ticks.next().await.is_some() {
            attempt += 1;
            if predicate().await? {
                debug!(attempt, "condition met");
                return Ok(());
            }
            trace!(attempt, "condition not met yet");
        }
        Err(ProviderError::Sdk("poll ticker stopped".to_string()))
    };

    match tokio::time::timeout(options.timeout, poll).await {
        Ok(result) => result,
        Err(elapsed) => {
            debug!(timeout = ?options.timeout, "gave up waiting");
            Err(ProviderError::Timeout {
                operation: operation.to_string(),
                timeout: options.timeout,
                last_state: None,
                source: elapsed,
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_timeout;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(5);

    fn options(timeout: Duration) -> PollOptions {
        PollOptions::new().with_interval(INTERVAL).with_timeout(timeout)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_tick() {
        let calls = &AtomicUsize::new(0);
        let start = Instant::now();

        let result = poll_until("third time lucky", &options(INTERVAL * 10), || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) + 1 == 3)
        })
        .await;

        tokio_test::assert_ok!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_configured_duration() {
        let calls = &AtomicUsize::new(0);
        let start = Instant::now();

        let result = poll_until("never", &options(INTERVAL * 3), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        })
        .await;

        let err = assert_timeout(result);
        assert_eq!(err.to_string(), "never: timed out after 15s");

        let elapsed = start.elapsed();
        assert!(elapsed >= INTERVAL * 3, "returned early: {:?}", elapsed);
        assert!(elapsed < INTERVAL * 4, "returned late: {:?}", elapsed);
        assert!(calls.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_short_circuits() {
        let calls = &AtomicUsize::new(0);
        let start = Instant::now();

        let result = poll_until("denied", &options(INTERVAL * 10), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::PermissionDenied("no access".to_string()))
        })
        .await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_predicate_does_not_overlap() {
        let in_flight = &AtomicUsize::new(0);
        let max_in_flight = &AtomicUsize::new(0);
        let calls = &AtomicUsize::new(0);

        let result = poll_until("slow", &options(INTERVAL * 20), || async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(INTERVAL * 2).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(calls.fetch_add(1, Ordering::SeqCst) + 1 == 3)
        })
        .await;

        tokio_test::assert_ok!(result);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_drops_in_flight_predicate() {
        let result = poll_until("hung", &options(INTERVAL * 2), || async {
            std::future::pending::<()>().await;
            Ok(true)
        })
        .await;

        assert_timeout(result);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_durations() {
        let calls = &AtomicUsize::new(0);
        let predicate = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        };

        let zero_interval = PollOptions::new().with_interval(Duration::ZERO);
        let err = poll_until("zero", &zero_interval, predicate).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let zero_timeout = PollOptions::new().with_timeout(Duration::ZERO);
        let err = poll_until("zero", &zero_timeout, predicate).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_defaults() {
        let options = PollOptions::default();
        assert_eq!(options.interval, Duration::from_secs(5));
        assert_eq!(options.timeout, Duration::from_secs(300));
    }
}
