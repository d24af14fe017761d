//! Poll a configuration until the observed value matches the desired one.

use std::fmt::Debug;
use std::future::Future;

use tracing::{debug, instrument, trace};

use crate::compare::Equivalent;
use crate::error::ProviderError;
use crate::poll::{poll_until, PollOptions};

/// Whether a fetch error means "not visible yet" while waiting for a write.
///
/// Transient errors qualify, and so does not-found: a configuration that was
/// just written can briefly read back as missing. Everything else aborts.
pub fn is_pending_visibility(err: &ProviderError) -> bool {
    err.is_transient() || err.is_not_found()
}

/// Fetch the observed configuration every tick until it is equivalent to `desired`.
///
/// Fetch errors for which [`is_pending_visibility`] holds count as "not yet";
/// any other error ends the wait immediately.
#[instrument(skip_all, fields(operation = %operation))]
pub async fn wait_for_convergence<C, F, Fut>(
    operation: &str,
    options: &PollOptions,
    desired: &C,
    mut fetch: F,
) -> Result<(), ProviderError>
where
    C: Equivalent + Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<C, ProviderError>>,
{
    poll_until(operation, options, || {
        let observed = fetch();
        async move {
            match observed.await {
                Ok(observed) => {
                    let converged = desired.equivalent(&observed);
                    if !converged {
                        trace!(?observed, "observed configuration differs");
                    }
                    Ok(converged)
                },
                Err(err) if is_pending_visibility(&err) => {
                    debug!(error = %err, "configuration not visible yet");
                    Ok(false)
                },
                Err(err) => Err(err),
            }
        }
    })
    .await
}

/// Fetch every tick until the remote reports the configuration as not found.
///
/// Transient errors count as "not yet".
#[instrument(skip_all, fields(operation = %operation))]
pub async fn wait_for_absence<T, F, Fut>(
    operation: &str,
    options: &PollOptions,
    mut fetch: F,
) -> Result<(), ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    poll_until(operation, options, || {
        let observed = fetch();
        async move {
            match observed.await {
                Ok(_) => Ok(false),
                Err(err) if err.is_not_found() => Ok(true),
                Err(err) if err.is_transient() => {
                    debug!(error = %err, "retrying");
                    Ok(false)
                },
                Err(err) => Err(err),
            }
        }
    })
    .await
}
