//! Virtual private clouds. VPCs are global: they have no zone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::{expect_found, ignore_not_found};
use crate::error::ProviderError;
use crate::poll::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::sweep::SweepSource;
use crate::waiter::StateChangeConf;

/// Lifecycle status of a VPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VpcStatus {
    /// Being created.
    Creating,
    /// Usable.
    Ready,
    /// Being deleted.
    Deleting,
    /// Creation failed.
    Failed,
}

impl VpcStatus {
    /// The label the remote reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            VpcStatus::Creating => "CREATING",
            VpcStatus::Ready => "READY",
            VpcStatus::Deleting => "DELETING",
            VpcStatus::Failed => "FAILED",
        }
    }
}

/// A VPC as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vpc {
    /// Opaque id.
    pub id: String,
    /// Display name; sweeps match on this.
    pub name: String,
    /// Raw status label.
    pub status: String,
}

/// Client for the VPC API.
#[async_trait]
pub trait VpcApi: Send + Sync {
    /// Fetch one VPC. A missing VPC is [`ProviderError::NotFound`].
    async fn get_vpc(&self, id: &str) -> Result<Vpc, ProviderError>;

    /// List all VPCs.
    async fn list_vpcs(&self) -> Result<Vec<Vpc>, ProviderError>;

    /// Start deleting a VPC.
    async fn delete_vpc(&self, id: &str) -> Result<(), ProviderError>;
}

fn with_status(vpc: Vpc) -> (Vpc, String) {
    let status = vpc.status.clone();
    (vpc, status)
}

/// Wait for a VPC to become `READY`.
#[instrument(skip(api))]
pub async fn wait_for_vpc_ready<A>(api: &A, id: &str, timeout: Duration) -> Result<Vpc, ProviderError>
where
    A: VpcApi + ?Sized,
{
    let found = StateChangeConf::new(format!("vpc {} to become READY", id))
        .with_pending([VpcStatus::Creating.as_str()])
        .with_target([VpcStatus::Ready.as_str()])
        .with_interval(DEFAULT_POLL_INTERVAL)
        .with_timeout(timeout)
        .wait_for_state(move || async move { api.get_vpc(id).await.map(with_status) })
        .await?;
    expect_found(found, &format!("vpc {}", id))
}

/// Wait for a VPC to disappear. Every status, `FAILED` included, is pending.
#[instrument(skip(api))]
pub async fn wait_for_vpc_deleted<A>(api: &A, id: &str, timeout: Duration) -> Result<(), ProviderError>
where
    A: VpcApi + ?Sized,
{
    StateChangeConf::new(format!("vpc {} to be deleted", id))
        .with_pending([
            VpcStatus::Creating.as_str(),
            VpcStatus::Ready.as_str(),
            VpcStatus::Deleting.as_str(),
            VpcStatus::Failed.as_str(),
        ])
        .with_interval(DEFAULT_POLL_INTERVAL)
        .with_timeout(timeout)
        .wait_for_state(move || async move { api.get_vpc(id).await.map(with_status) })
        .await?;
    Ok(())
}

/// Sweeps VPCs; register it with a global [`crate::sweep::SweeperConfig`].
pub struct VpcSweeper<A: ?Sized> {
    api: Arc<A>,
}

impl<A: VpcApi + ?Sized> VpcSweeper<A> {
    /// Create a sweeper over `api`.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: VpcApi + ?Sized> SweepSource for VpcSweeper<A> {
    type Resource = Vpc;

    fn resource_type(&self) -> &str {
        "vpc"
    }

    async fn list(&self) -> Result<Vec<Vpc>, ProviderError> {
        self.api.list_vpcs().await
    }

    fn name(&self, vpc: &Vpc) -> String {
        vpc.name.clone()
    }

    async fn delete(&self, vpc: &Vpc) -> Result<(), ProviderError> {
        ignore_not_found(self.api.delete_vpc(&vpc.id).await)?;
        wait_for_vpc_deleted(self.api.as_ref(), &vpc.id, DEFAULT_POLL_TIMEOUT).await?;
        info!(id = %vpc.id, name = %vpc.name, "vpc deleted");
        Ok(())
    }
}
