//! Test doubles for code built on this crate.
//!
//! Provider implementations can use these to exercise their waits and
//! sweepers without a remote API:
//!
//! - [`Script`] plays back a fixed sequence of fetch results.
//! - [`RefreshScript`] does the same for `(resource, state)` refreshes.
//! - [`InMemorySweepSource`] is a lister/deleter over an in-memory list.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hemmer_provider_convergence::testing::RefreshScript;
//! use hemmer_provider_convergence::waiter::StateChangeConf;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let script = RefreshScript::new()
//!     .then_state("w-1", "CREATING")
//!     .then_state("w-1", "ACTIVE");
//! let conf = StateChangeConf::new("widget w-1")
//!     .with_pending(["CREATING"])
//!     .with_target(["ACTIVE"])
//!     .with_interval(Duration::from_millis(1));
//!
//! conf.wait_for_state(|| script.next()).await.unwrap();
//! assert_eq!(script.calls(), 2);
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::sweep::SweepSource;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted sequence of fetch results.
///
/// Each call to [`Script::next`] pops the next step. Once the steps run
/// out, the script keeps returning its repeat value if one was set, and an
/// [`ProviderError::Sdk`] error otherwise.
pub struct Script<T> {
    steps: Mutex<VecDeque<Result<T, ProviderError>>>,
    repeat: Option<T>,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            repeat: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a script that returns `value` forever.
    pub fn repeating(value: T) -> Self {
        Self {
            repeat: Some(value),
            ..Self::new()
        }
    }

    /// Append a successful result.
    pub fn then(self, value: T) -> Self {
        lock(&self.steps).push_back(Ok(value));
        self
    }

    /// Append a failure.
    pub fn then_err(self, err: ProviderError) -> Self {
        lock(&self.steps).push_back(Err(err));
        self
    }

    /// Pop the next result.
    pub fn next(&self) -> Ready<Result<T, ProviderError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = lock(&self.steps).pop_front();
        ready(match (step, &self.repeat) {
            (Some(step), _) => step,
            (None, Some(value)) => Ok(value.clone()),
            (None, None) => Err(ProviderError::Sdk(format!(
                "script exhausted at call {}",
                call
            ))),
        })
    }

    /// Number of times [`Script::next`] has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A scripted sequence of `(resource, state)` refreshes for state waits.
pub struct RefreshScript<R> {
    inner: Script<(R, String)>,
}

impl<R: Clone> RefreshScript<R> {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            inner: Script::new(),
        }
    }

    /// Create a script that reports `state` forever.
    pub fn repeating(resource: R, state: impl Into<String>) -> Self {
        Self {
            inner: Script::repeating((resource, state.into())),
        }
    }

    /// Append a refresh that observes `state`.
    pub fn then_state(self, resource: R, state: impl Into<String>) -> Self {
        Self {
            inner: self.inner.then((resource, state.into())),
        }
    }

    /// Append a failed refresh.
    pub fn then_err(self, err: ProviderError) -> Self {
        Self {
            inner: self.inner.then_err(err),
        }
    }

    /// Pop the next refresh result.
    pub fn next(&self) -> Ready<Result<(R, String), ProviderError>> {
        self.inner.next()
    }

    /// Number of refreshes made so far.
    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl<R: Clone> Default for RefreshScript<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// A resource held by [`InMemorySweepSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResource {
    /// Resource name.
    pub name: String,
    /// Resource zone, if the type is zonal.
    pub zone: Option<String>,
}

impl FakeResource {
    /// A resource living in `zone`.
    pub fn zonal(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone: Some(zone.into()),
        }
    }

    /// A resource without a zone.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone: None,
        }
    }
}

/// An in-memory [`SweepSource`] that records what it deleted.
pub struct InMemorySweepSource {
    resource_type: String,
    resources: Mutex<Vec<FakeResource>>,
    deleted: Mutex<Vec<String>>,
    delete_failures: Mutex<HashMap<String, ProviderError>>,
    list_failure: Mutex<Option<ProviderError>>,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    list_delay: Duration,
    delete_delay: Duration,
}

impl InMemorySweepSource {
    /// Create a source holding `resources`.
    pub fn new(resource_type: impl Into<String>, resources: Vec<FakeResource>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resources: Mutex::new(resources),
            deleted: Mutex::new(Vec::new()),
            delete_failures: Mutex::new(HashMap::new()),
            list_failure: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            list_delay: Duration::ZERO,
            delete_delay: Duration::ZERO,
        }
    }

    /// Make every listing take `delay`.
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Make every deletion take `delay` before it lands.
    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    /// Make the next deletion of `name` fail with `err`.
    pub fn fail_delete(self, name: impl Into<String>, err: ProviderError) -> Self {
        lock(&self.delete_failures).insert(name.into(), err);
        self
    }

    /// Make the next listing fail with `err`.
    pub fn fail_list(self, err: ProviderError) -> Self {
        *lock(&self.list_failure) = Some(err);
        self
    }

    /// Names deleted so far, in deletion order.
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    /// Names still present.
    pub fn remaining(&self) -> Vec<String> {
        lock(&self.resources)
            .iter()
            .map(|resource| resource.name.clone())
            .collect()
    }

    /// Number of list calls made.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls made, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SweepSource for InMemorySweepSource {
    type Resource = FakeResource;

    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    async fn list(&self) -> Result<Vec<FakeResource>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        if let Some(err) = lock(&self.list_failure).take() {
            return Err(err);
        }
        Ok(lock(&self.resources).clone())
    }

    fn name(&self, resource: &FakeResource) -> String {
        resource.name.clone()
    }

    fn zone(&self, resource: &FakeResource) -> Option<String> {
        resource.zone.clone()
    }

    async fn delete(&self, resource: &FakeResource) -> Result<(), ProviderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delete_delay.is_zero() {
            tokio::time::sleep(self.delete_delay).await;
        }
        if let Some(err) = lock(&self.delete_failures).remove(&resource.name) {
            return Err(err);
        }
        let mut resources = lock(&self.resources);
        let before = resources.len();
        resources.retain(|existing| existing.name != resource.name);
        if resources.len() < before {
            lock(&self.deleted).push(resource.name.clone());
        }
        Ok(())
    }
}

// =============================================================================
// Assertion Helpers
// =============================================================================

/// Assert that a wait ended with [`ProviderError::Timeout`] and return it.
///
/// # Panics
///
/// Panics if the result is `Ok` or a different error.
pub fn assert_timeout<T: Debug>(result: Result<T, ProviderError>) -> ProviderError {
    match result {
        Err(err) if err.is_timeout() => err,
        other => panic!("Expected a timeout, got: {:?}", other),
    }
}

/// Assert that a wait failed on the unexpected state `state` and return the error.
///
/// # Panics
///
/// Panics if the result is anything else.
pub fn assert_unexpected_state<T: Debug>(
    result: Result<T, ProviderError>,
    state: &str,
) -> ProviderError {
    match result {
        Err(err @ ProviderError::UnexpectedState { .. }) => {
            if let ProviderError::UnexpectedState { state: observed, .. } = &err {
                assert_eq!(observed, state, "Unexpected state label mismatch");
            }
            err
        },
        other => panic!("Expected unexpected state {:?}, got: {:?}", state, other),
    }
}

/// Assert that a sweep stopped while deleting `name` and return the error.
///
/// # Panics
///
/// Panics if the result is anything else.
pub fn assert_sweep_delete_failed(result: Result<(), ProviderError>, name: &str) -> ProviderError {
    match result {
        Err(err @ ProviderError::SweepDelete { .. }) => {
            assert!(
                err.to_string().contains(&format!("{:?}", name)),
                "Expected sweep error to name {:?}, got: {}",
                name,
                err
            );
            err
        },
        other => panic!("Expected sweep of {:?} to fail, got: {:?}", name, other),
    }
}
