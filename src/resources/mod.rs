//! Waits and sweepers for individual resource classes.
//!
//! Each resource class talks to the remote through its own client trait
//! ([`cluster::ClusterApi`], [`vpc::VpcApi`], [`bucket::BucketApi`],
//! [`telemetry::TelemetryApi`]). Callers inject an implementation backed by
//! their RPC client; tests inject a fake.
//!
//! | Resource  | Mechanism                    | Interval | Timeout |
//! |-----------|------------------------------|----------|---------|
//! | cluster   | status labels                | 15s      | 20m     |
//! | vpc       | status labels                | 5s       | 5m      |
//! | bucket    | configuration convergence    | 5s       | 5m      |
//! | telemetry | status labels                | 10s      | 10m     |

pub mod bucket;
pub mod cluster;
pub mod telemetry;
pub mod vpc;

use crate::error::ProviderError;

/// Treat a not-found delete as already done.
pub(crate) fn ignore_not_found(result: Result<(), ProviderError>) -> Result<(), ProviderError> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

/// Unwrap the resource returned by a wait with a non-empty target set.
pub(crate) fn expect_found<T>(found: Option<T>, what: &str) -> Result<T, ProviderError> {
    found.ok_or_else(|| ProviderError::NotFound(format!("{} disappeared while waiting", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_not_found() {
        assert!(ignore_not_found(Err(ProviderError::NotFound("x".into()))).is_ok());
        assert!(ignore_not_found(Err(ProviderError::Unavailable("x".into()))).is_err());
        assert!(ignore_not_found(Ok(())).is_ok());
    }

    #[test]
    fn test_expect_found() {
        assert_eq!(expect_found(Some(1), "widget").unwrap(), 1);
        let err = expect_found::<u8>(None, "widget w-1").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("widget w-1 disappeared"));
    }
}
