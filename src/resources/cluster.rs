//! Zonal compute clusters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::{expect_found, ignore_not_found};
use crate::error::ProviderError;
use crate::sweep::SweepSource;
use crate::waiter::StateChangeConf;

/// Delay between cluster refreshes.
pub const CLUSTER_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Default budget for a cluster to settle.
pub const CLUSTER_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Lifecycle status of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterStatus {
    /// Being created.
    Provisioning,
    /// Being changed.
    Updating,
    /// Serving.
    Running,
    /// Being deleted.
    Deleting,
    /// Broken; needs operator attention.
    Error,
}

impl ClusterStatus {
    /// The label the remote reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Provisioning => "PROVISIONING",
            ClusterStatus::Updating => "UPDATING",
            ClusterStatus::Running => "RUNNING",
            ClusterStatus::Deleting => "DELETING",
            ClusterStatus::Error => "ERROR",
        }
    }
}

/// A cluster as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Cluster name, unique within its zone.
    pub name: String,
    /// Zone the cluster lives in.
    pub zone: String,
    /// Raw status label.
    pub status: String,
}

/// Client for the cluster API.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch one cluster. A missing cluster is [`ProviderError::NotFound`].
    async fn get_cluster(&self, zone: &str, name: &str) -> Result<Cluster, ProviderError>;

    /// List clusters in every zone.
    async fn list_clusters(&self) -> Result<Vec<Cluster>, ProviderError>;

    /// Start deleting a cluster.
    async fn delete_cluster(&self, zone: &str, name: &str) -> Result<(), ProviderError>;
}

fn conf(operation: String, timeout: Duration) -> StateChangeConf {
    StateChangeConf::new(operation)
        .with_interval(CLUSTER_POLL_INTERVAL)
        .with_timeout(timeout)
}

fn with_status(cluster: Cluster) -> (Cluster, String) {
    let status = cluster.status.clone();
    (cluster, status)
}

/// Wait for a cluster to reach `RUNNING`.
#[instrument(skip(api))]
pub async fn wait_for_cluster_running<A>(
    api: &A,
    zone: &str,
    name: &str,
    timeout: Duration,
) -> Result<Cluster, ProviderError>
where
    A: ClusterApi + ?Sized,
{
    let what = format!("cluster {}/{}", zone, name);
    let found = conf(format!("{} to become RUNNING", what), timeout)
        .with_pending([
            ClusterStatus::Provisioning.as_str(),
            ClusterStatus::Updating.as_str(),
        ])
        .with_target([ClusterStatus::Running.as_str()])
        .wait_for_state(move || async move { api.get_cluster(zone, name).await.map(with_status) })
        .await?;
    expect_found(found, &what)
}

/// Wait for a cluster to disappear.
///
/// Every status is pending: a cluster being deleted can still report the
/// label it had before the delete call, `ERROR` included.
#[instrument(skip(api))]
pub async fn wait_for_cluster_deleted<A>(
    api: &A,
    zone: &str,
    name: &str,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: ClusterApi + ?Sized,
{
    conf(format!("cluster {}/{} to be deleted", zone, name), timeout)
        .with_pending([
            ClusterStatus::Provisioning.as_str(),
            ClusterStatus::Updating.as_str(),
            ClusterStatus::Running.as_str(),
            ClusterStatus::Deleting.as_str(),
            ClusterStatus::Error.as_str(),
        ])
        .wait_for_state(move || async move { api.get_cluster(zone, name).await.map(with_status) })
        .await?;
    Ok(())
}

/// Sweeps clusters; register it with a zonal [`crate::sweep::SweeperConfig`].
pub struct ClusterSweeper<A: ?Sized> {
    api: Arc<A>,
    timeout: Duration,
}

impl<A: ClusterApi + ?Sized> ClusterSweeper<A> {
    /// Create a sweeper that waits up to [`CLUSTER_TIMEOUT`] per deletion.
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            timeout: CLUSTER_TIMEOUT,
        }
    }

    /// Override the per-deletion wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<A: ClusterApi + ?Sized> SweepSource for ClusterSweeper<A> {
    type Resource = Cluster;

    fn resource_type(&self) -> &str {
        "cluster"
    }

    async fn list(&self) -> Result<Vec<Cluster>, ProviderError> {
        self.api.list_clusters().await
    }

    fn name(&self, cluster: &Cluster) -> String {
        cluster.name.clone()
    }

    fn zone(&self, cluster: &Cluster) -> Option<String> {
        Some(cluster.zone.clone())
    }

    async fn delete(&self, cluster: &Cluster) -> Result<(), ProviderError> {
        ignore_not_found(self.api.delete_cluster(&cluster.zone, &cluster.name).await)?;
        wait_for_cluster_deleted(self.api.as_ref(), &cluster.zone, &cluster.name, self.timeout)
            .await?;
        info!(zone = %cluster.zone, name = %cluster.name, "cluster deleted");
        Ok(())
    }
}
