//! Wait for a resource's lifecycle state to reach a target.
//!
//! Remote APIs that expose a discrete status enum are waited on with a
//! [`StateChangeConf`]: a set of pending labels that keep the wait going, a
//! set of target labels that end it, and a refresh function that fetches the
//! resource together with its current label.
//!
//! A label outside both sets ends the wait immediately with
//! [`ProviderError::UnexpectedState`]. Waiting for deletion is expressed with
//! an empty target set; a not-found refresh then counts as convergence.
//!
//! ```
//! use std::time::Duration;
//! use hemmer_provider_convergence::waiter::StateChangeConf;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), hemmer_provider_convergence::ProviderError> {
//! let conf = StateChangeConf::new("cluster c-1 to become RUNNING")
//!     .with_pending(["PROVISIONING"])
//!     .with_target(["RUNNING"])
//!     .with_interval(Duration::from_millis(1));
//!
//! let cluster = conf
//!     .wait_for_state(|| async { Ok(("c-1", "RUNNING".to_string())) })
//!     .await?;
//! assert_eq!(cluster, Some("c-1"));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, trace};

use crate::error::ProviderError;

/// Pending/target vocabulary and timing for a single state wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeConf {
    /// Human-readable description of what is being waited on, used in errors.
    pub operation: String,
    /// Labels that mean "still changing".
    pub pending: BTreeSet<String>,
    /// Labels that mean "done". Empty when waiting for deletion.
    pub target: BTreeSet<String>,
    /// Delay between refreshes. The first refresh happens immediately.
    pub interval: Duration,
    /// Total wall-clock budget for the wait.
    pub timeout: Duration,
}

impl StateChangeConf {
    /// Create a wait with no states, a 5 second interval and a 5 minute timeout.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(5 * 60),
        }
    }

    /// Add labels that keep the wait going.
    pub fn with_pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    /// Add labels that complete the wait.
    pub fn with_target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.extend(states.into_iter().map(Into::into));
        self
    }

    /// Set the delay between refreshes.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the total timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when this conf waits for the resource to disappear.
    pub fn waits_for_deletion(&self) -> bool {
        self.target.is_empty()
    }

    /// Check durations and that no label is both pending and a target.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.interval.is_zero() || self.timeout.is_zero() {
            return Err(ProviderError::Configuration(format!(
                "{}: interval and timeout must be positive",
                self.operation
            )));
        }
        if let Some(state) = self.pending.intersection(&self.target).next() {
            return Err(ProviderError::Configuration(format!(
                "{}: state {:?} is both pending and a target",
                self.operation, state
            )));
        }
        Ok(())
    }

    /// Refresh the resource until its state is a target.
    ///
    /// Returns `Some(resource)` from the refresh that observed a target
    /// state, or `None` when waiting for deletion and the refresh reported
    /// not-found. Any refresh error other than that is returned unchanged
    /// without retrying; refresh functions that want to ride out transient
    /// failures must report a pending state instead.
    #[instrument(skip_all, fields(operation = %self.operation))]
    pub async fn wait_for_state<T, F, Fut>(&self, mut refresh: F) -> Result<Option<T>, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String), ProviderError>>,
    {
        self.validate()?;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_state: Option<String> = None;

        let wait = async {
            let mut attempt: u32 = 0;
            loop {
                ticker.tick().await;
                attempt += 1;

                let (resource, state) = match refresh().await {
                    Ok(observed) => observed,
                    Err(err) if err.is_not_found() && self.waits_for_deletion() => {
                        debug!(attempt, "resource is gone");
                        return Ok(None);
                    },
                    Err(err) => return Err(err),
                };

                if last_state.as_deref() != Some(state.as_str()) {
                    debug!(attempt, state = %state, "state changed");
                    last_state = Some(state.clone());
                } else {
                    trace!(attempt, state = %state, "still waiting");
                }

                if self.target.contains(&state) {
                    return Ok(Some(resource));
                }
                if !self.pending.contains(&state) {
                    return Err(ProviderError::UnexpectedState {
                        operation: self.operation.clone(),
                        state,
                        pending: self.pending.iter().cloned().collect(),
                        target: self.target.iter().cloned().collect(),
                    });
                }
            }
        };

        let result = tokio::time::timeout(self.timeout, wait).await;
        match result {
            Ok(outcome) => outcome,
            Err(elapsed) => Err(ProviderError::Timeout {
                operation: self.operation.clone(),
                timeout: self.timeout,
                last_state,
                source: elapsed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_timeout, assert_unexpected_state, RefreshScript};
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn create_conf() -> StateChangeConf {
        StateChangeConf::new("widget w-1 to become READY")
            .with_pending(["PENDING"])
            .with_target(["READY"])
            .with_interval(INTERVAL)
            .with_timeout(INTERVAL * 30)
    }

    fn delete_conf() -> StateChangeConf {
        StateChangeConf::new("widget w-1 deletion")
            .with_pending(["DELETING"])
            .with_interval(INTERVAL)
            .with_timeout(INTERVAL * 30)
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_on_target() {
        let script = RefreshScript::new()
            .then_state(1, "PENDING")
            .then_state(2, "PENDING")
            .then_state(3, "READY");

        let resource = create_conf().wait_for_state(|| script.next()).await.unwrap();

        assert_eq!(resource, Some(3));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_refresh_is_immediate() {
        let script = RefreshScript::new().then_state((), "READY");
        let start = Instant::now();

        create_conf().wait_for_state(|| script.next()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_state_fails_fast() {
        let script = RefreshScript::new()
            .then_state((), "PENDING")
            .then_state((), "ERRORED")
            .then_state((), "READY");

        let result = create_conf().wait_for_state(|| script.next()).await;

        assert_unexpected_state(result, "ERRORED");
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_wait_treats_not_found_as_done() {
        let script = RefreshScript::new()
            .then_state((), "DELETING")
            .then_err(ProviderError::NotFound("w-1".to_string()));

        let resource = delete_conf().wait_for_state(|| script.next()).await.unwrap();

        assert!(resource.is_none());
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_fatal_when_waiting_for_target() {
        let script = RefreshScript::<()>::new()
            .then_err(ProviderError::NotFound("w-1".to_string()));

        let err = create_conf().wait_for_state(|| script.next()).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_errors_are_not_retried() {
        let script = RefreshScript::new()
            .then_state((), "PENDING")
            .then_err(ProviderError::Unavailable("try later".to_string()))
            .then_state((), "READY");

        let err = create_conf().wait_for_state(|| script.next()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_last_state() {
        let conf = create_conf().with_timeout(INTERVAL * 3);
        let script = RefreshScript::repeating((), "PENDING");
        let start = Instant::now();

        let err = assert_timeout(conf.wait_for_state(|| script.next()).await);

        match err {
            ProviderError::Timeout {
                last_state,
                timeout,
                ..
            } => {
                assert_eq!(last_state.as_deref(), Some("PENDING"));
                assert_eq!(timeout, INTERVAL * 3);
            },
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(start.elapsed(), INTERVAL * 3);
    }

    #[tokio::test]
    async fn test_overlapping_states_rejected() {
        let conf = create_conf().with_pending(["READY"]);
        let script = RefreshScript::new().then_state((), "READY");

        let err = conf.wait_for_state(|| script.next()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(script.calls(), 0);
    }
}
