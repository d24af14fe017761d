//! Error types for convergence waits and sweeps.
//!
//! Remote failures arrive from the RPC client as [`tonic::Status`] and are
//! translated into [`ProviderError`] so that waiters can tell the three
//! classes apart: not-found, transient (keep polling) and fatal (abort).
//! Conditions produced by this crate itself ([`ProviderError::Timeout`],
//! [`ProviderError::UnexpectedState`], sweep and configuration errors) carry
//! enough context to be shown to an operator as-is.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by waiters, comparators and sweepers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// An internal error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error, detected before any remote call was made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The remote aborted the call, usually because of a concurrent change.
    #[error("Aborted: {0}")]
    Aborted(String),

    /// A single remote call exceeded its own deadline.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not implemented by the remote.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The remote rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote failed with an internal or unclassified error.
    #[error("Remote error: {0}")]
    Remote(String),

    /// A wait ran out of time before the resource converged.
    #[error("{operation}: timed out after {timeout:?}{}", describe_last_state(.last_state))]
    Timeout {
        /// The operation that was being waited on.
        operation: String,
        /// The configured timeout.
        timeout: Duration,
        /// The last state label observed before the deadline, if any.
        last_state: Option<String>,
        /// The elapsed deadline.
        #[source]
        source: tokio::time::error::Elapsed,
    },

    /// A resource reported a state that is neither pending nor a target.
    #[error(
        "{operation}: unexpected state {state:?} (pending: {}, target: {})",
        .pending.join(", "),
        describe_target(.target)
    )]
    UnexpectedState {
        /// The operation that was being waited on.
        operation: String,
        /// The state label that was observed.
        state: String,
        /// The states that would have continued the wait.
        pending: Vec<String>,
        /// The states that would have completed the wait.
        target: Vec<String>,
    },

    /// Listing resources at the start of a sweep failed.
    #[error("failed to list {resource_type} resources for sweep: {source}")]
    SweepList {
        /// The swept resource type.
        resource_type: String,
        /// The lister error.
        #[source]
        source: Box<ProviderError>,
    },

    /// Deleting a resource during a sweep failed.
    #[error("failed to sweep {resource_type} {name:?}: {source}")]
    SweepDelete {
        /// The swept resource type.
        resource_type: String,
        /// The name of the resource that could not be deleted.
        name: String,
        /// The deleter error.
        #[source]
        source: Box<ProviderError>,
    },
}

fn describe_last_state(last_state: &Option<String>) -> String {
    match last_state {
        Some(state) => format!(" (last state: {})", state),
        None => String::new(),
    }
}

fn describe_target(target: &[String]) -> String {
    if target.is_empty() {
        "<deleted>".to_string()
    } else {
        target.join(", ")
    }
}

impl ProviderError {
    /// Returns true if the remote reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the error is expected to resolve itself with time.
    ///
    /// Only throttling, unavailability and aborted calls qualify. Permission
    /// and validation failures never do, even though they may look
    /// intermittent during credential rotation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::ResourceExhausted(_) | Self::Aborted(_)
        )
    }

    /// Returns true if this is a wait deadline produced by this crate.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<tonic::Status> for ProviderError {
    fn from(status: tonic::Status) -> Self {
        let msg = status.message().to_string();
        match status.code() {
            tonic::Code::NotFound => ProviderError::NotFound(msg),
            tonic::Code::AlreadyExists => ProviderError::AlreadyExists(msg),
            tonic::Code::PermissionDenied | tonic::Code::Unauthenticated => {
                ProviderError::PermissionDenied(msg)
            },
            tonic::Code::ResourceExhausted => ProviderError::ResourceExhausted(msg),
            tonic::Code::Unavailable => ProviderError::Unavailable(msg),
            tonic::Code::Aborted => ProviderError::Aborted(msg),
            tonic::Code::DeadlineExceeded => ProviderError::DeadlineExceeded(msg),
            tonic::Code::FailedPrecondition => ProviderError::FailedPrecondition(msg),
            tonic::Code::Unimplemented => ProviderError::Unimplemented(msg),
            tonic::Code::InvalidArgument | tonic::Code::OutOfRange => {
                ProviderError::InvalidRequest(msg)
            },
            _ => ProviderError::Remote(format!("{:?}: {}", status.code(), msg)),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Sdk(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::Aborted(msg) => tonic::Status::aborted(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Remote(msg) => tonic::Status::internal(msg),
            err @ ProviderError::Timeout { .. } => tonic::Status::deadline_exceeded(err.to_string()),
            err @ ProviderError::UnexpectedState { .. } => {
                tonic::Status::failed_precondition(err.to_string())
            },
            err @ (ProviderError::SweepList { .. } | ProviderError::SweepDelete { .. }) => {
                tonic::Status::internal(err.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn elapsed() -> tokio::time::error::Elapsed {
        tokio::time::timeout(Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err()
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("cluster-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: cluster-123");

        let err = ProviderError::Configuration("zone is required".to_string());
        assert_eq!(format!("{}", err), "Configuration error: zone is required");
    }

    #[test]
    fn test_unexpected_state_display() {
        let err = ProviderError::UnexpectedState {
            operation: "cluster c-1 to become RUNNING".to_string(),
            state: "ERROR".to_string(),
            pending: vec!["PROVISIONING".to_string()],
            target: vec!["RUNNING".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cluster c-1 to become RUNNING: unexpected state \"ERROR\" (pending: PROVISIONING, target: RUNNING)"
        );

        let err = ProviderError::UnexpectedState {
            operation: "vpc v-1 deletion".to_string(),
            state: "READY".to_string(),
            pending: vec!["DELETING".to_string()],
            target: vec![],
        };
        assert!(err.to_string().ends_with("target: <deleted>)"));
    }

    #[tokio::test]
    async fn test_timeout_display_names_operation_and_duration() {
        let err = ProviderError::Timeout {
            operation: "bucket b-1 lifecycle".to_string(),
            timeout: Duration::from_secs(300),
            last_state: None,
            source: elapsed().await,
        };
        assert_eq!(err.to_string(), "bucket b-1 lifecycle: timed out after 300s");
        assert!(err.is_timeout());
        assert!(std::error::Error::source(&err).is_some());

        let err = ProviderError::Timeout {
            operation: "cluster c-1".to_string(),
            timeout: Duration::from_secs(60),
            last_state: Some("PROVISIONING".to_string()),
            source: elapsed().await,
        };
        assert_eq!(
            err.to_string(),
            "cluster c-1: timed out after 60s (last state: PROVISIONING)"
        );
    }

    #[test]
    fn test_sweep_delete_display_names_resource() {
        let err = ProviderError::SweepDelete {
            resource_type: "cluster".to_string(),
            name: "test-acc-1".to_string(),
            source: Box::new(ProviderError::PermissionDenied("nope".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "failed to sweep cluster \"test-acc-1\": Permission denied: nope"
        );
    }

    #[test]
    fn test_classification() {
        assert!(ProviderError::NotFound("x".into()).is_not_found());
        assert!(!ProviderError::NotFound("x".into()).is_transient());

        assert!(ProviderError::Unavailable("x".into()).is_transient());
        assert!(ProviderError::ResourceExhausted("x".into()).is_transient());
        assert!(ProviderError::Aborted("x".into()).is_transient());

        assert!(!ProviderError::PermissionDenied("x".into()).is_transient());
        assert!(!ProviderError::InvalidRequest("x".into()).is_transient());
        assert!(!ProviderError::DeadlineExceeded("x".into()).is_timeout());
    }

    #[test]
    fn test_status_to_error() {
        let err: ProviderError = tonic::Status::not_found("gone").into();
        assert!(matches!(err, ProviderError::NotFound(ref m) if m == "gone"));

        let err: ProviderError = tonic::Status::unauthenticated("token").into();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));

        let err: ProviderError = tonic::Status::unavailable("later").into();
        assert!(err.is_transient());

        let err: ProviderError = tonic::Status::out_of_range("page").into();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        let err: ProviderError = tonic::Status::data_loss("oops").into();
        assert!(matches!(err, ProviderError::Remote(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Aborted("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Aborted);

        let status: tonic::Status = ProviderError::UnexpectedState {
            operation: "op".to_string(),
            state: "ERROR".to_string(),
            pending: vec![],
            target: vec!["READY".to_string()],
        }
        .into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
        assert!(status.message().contains("ERROR"));
    }

    #[tokio::test]
    async fn test_timeout_to_status() {
        let status: tonic::Status = ProviderError::Timeout {
            operation: "op".to_string(),
            timeout: Duration::from_secs(1),
            last_state: None,
            source: elapsed().await,
        }
        .into();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
        assert_eq!(status.message(), "op: timed out after 1s");
    }
}
