//! Hemmer Provider Convergence
//!
//! Remote infrastructure APIs are eventually consistent: a create call
//! returns before the resource is usable, a configuration write returns
//! before it reads back, and a delete returns before the resource is gone.
//! This crate provides the pieces a Hemmer provider needs to bridge that gap
//! without hand-rolled sleep loops.
//!
//! # Overview
//!
//! - **Poller** ([`poll_until`]): evaluate a predicate on a fixed interval
//!   until it holds, fails, or a timeout expires.
//! - **State waiter** ([`StateChangeConf`]): refresh a resource until its
//!   status label reaches a target, failing fast on unknown labels.
//! - **Comparators** ([`compare`]): decide whether an observed configuration
//!   matches a desired one (versioning, access policies, lifecycle rules).
//! - **Convergence** ([`wait_for_convergence`]): the poller and a comparator
//!   combined, for settings that have no status label.
//! - **Sweeper** ([`sweep()`], [`SweeperRegistry`]): delete resources left
//!   behind by acceptance tests.
//! - **Resources** ([`resources`]): ready-made waits and sweepers for
//!   clusters, VPCs, buckets and telemetry endpoints.
//! - **Error types**: [`ProviderError`], classified into not-found,
//!   transient and fatal.
//! - **Logging**: integration with `tracing` for structured logging.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use hemmer_provider_convergence::{init_logging, StateChangeConf};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let cluster = StateChangeConf::new("cluster c-1 to become RUNNING")
//!         .with_pending(["PROVISIONING", "UPDATING"])
//!         .with_target(["RUNNING"])
//!         .with_interval(Duration::from_secs(15))
//!         .with_timeout(Duration::from_secs(20 * 60))
//!         .wait_for_state(|| async {
//!             let cluster = client.get_cluster("c-1").await?;
//!             let status = cluster.status.clone();
//!             Ok::<_, hemmer_provider_convergence::ProviderError>((cluster, status))
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Cancellation
//!
//! Every wait is an ordinary future. Dropping it (for example from a
//! `tokio::select!` branch) stops polling at the next await point; no
//! background task is left behind.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compare;
pub mod converge;
pub mod error;
pub mod logging;
pub mod message;
pub mod poll;
pub mod proto;
pub mod resources;
pub mod sweep;
pub mod testing;
pub mod waiter;

// Re-export main types at crate root
pub use compare::{Equivalent, LifecycleConfiguration, PolicyDocument, VersioningStatus};
pub use converge::{wait_for_absence, wait_for_convergence};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, init_test_logging, try_init_logging};
pub use message::{encode, ToMessage};
pub use poll::{poll_until, PollOptions};
pub use sweep::{sweep, DryRun, SweepSource, SweeperConfig, SweeperRegistry};
pub use waiter::StateChangeConf;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
