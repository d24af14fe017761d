//! Telemetry forwarding endpoints and the pipelines that feed them.

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use super::expect_found;
use crate::error::ProviderError;
use crate::waiter::StateChangeConf;

/// Delay between telemetry refreshes.
pub const TELEMETRY_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default budget for an endpoint or pipeline to settle.
pub const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Lifecycle status shared by endpoints and pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryStatus {
    /// Being created.
    Creating,
    /// Being changed.
    Updating,
    /// Forwarding.
    Active,
    /// Being deleted.
    Deleting,
    /// Broken.
    Error,
}

impl TelemetryStatus {
    /// The label the remote reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryStatus::Creating => "CREATING",
            TelemetryStatus::Updating => "UPDATING",
            TelemetryStatus::Active => "ACTIVE",
            TelemetryStatus::Deleting => "DELETING",
            TelemetryStatus::Error => "ERROR",
        }
    }
}

/// A forwarding endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Opaque id.
    pub id: String,
    /// Destination URL.
    pub url: String,
    /// Raw status label.
    pub status: String,
}

/// A pipeline routing telemetry to one or more endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Opaque id.
    pub id: String,
    /// Ids of the endpoints the pipeline forwards to.
    pub endpoint_ids: Vec<String>,
    /// Raw status label.
    pub status: String,
}

/// Client for the telemetry API.
#[async_trait]
pub trait TelemetryApi: Send + Sync {
    /// Fetch one endpoint. A missing endpoint is [`ProviderError::NotFound`].
    async fn get_endpoint(&self, id: &str) -> Result<Endpoint, ProviderError>;

    /// Fetch one pipeline. A missing pipeline is [`ProviderError::NotFound`].
    async fn get_pipeline(&self, id: &str) -> Result<Pipeline, ProviderError>;
}

fn active(what: &str, timeout: Duration) -> StateChangeConf {
    StateChangeConf::new(format!("{} to become ACTIVE", what))
        .with_pending([
            TelemetryStatus::Creating.as_str(),
            TelemetryStatus::Updating.as_str(),
        ])
        .with_target([TelemetryStatus::Active.as_str()])
        .with_interval(TELEMETRY_POLL_INTERVAL)
        .with_timeout(timeout)
}

fn deleted(what: &str, timeout: Duration) -> StateChangeConf {
    StateChangeConf::new(format!("{} to be deleted", what))
        .with_pending([
            TelemetryStatus::Creating.as_str(),
            TelemetryStatus::Updating.as_str(),
            TelemetryStatus::Active.as_str(),
            TelemetryStatus::Deleting.as_str(),
            TelemetryStatus::Error.as_str(),
        ])
        .with_interval(TELEMETRY_POLL_INTERVAL)
        .with_timeout(timeout)
}

fn endpoint_status(endpoint: Endpoint) -> (Endpoint, String) {
    let status = endpoint.status.clone();
    (endpoint, status)
}

fn pipeline_status(pipeline: Pipeline) -> (Pipeline, String) {
    let status = pipeline.status.clone();
    (pipeline, status)
}

/// Wait for an endpoint to become `ACTIVE`.
#[instrument(skip(api))]
pub async fn wait_for_endpoint_active<A>(
    api: &A,
    id: &str,
    timeout: Duration,
) -> Result<Endpoint, ProviderError>
where
    A: TelemetryApi + ?Sized,
{
    let what = format!("endpoint {}", id);
    let found = active(&what, timeout)
        .wait_for_state(move || async move { api.get_endpoint(id).await.map(endpoint_status) })
        .await?;
    expect_found(found, &what)
}

/// Wait for an endpoint to disappear.
#[instrument(skip(api))]
pub async fn wait_for_endpoint_deleted<A>(api: &A, id: &str, timeout: Duration) -> Result<(), ProviderError>
where
    A: TelemetryApi + ?Sized,
{
    deleted(&format!("endpoint {}", id), timeout)
        .wait_for_state(move || async move { api.get_endpoint(id).await.map(endpoint_status) })
        .await?;
    Ok(())
}

/// Wait for a pipeline to become `ACTIVE`.
#[instrument(skip(api))]
pub async fn wait_for_pipeline_active<A>(
    api: &A,
    id: &str,
    timeout: Duration,
) -> Result<Pipeline, ProviderError>
where
    A: TelemetryApi + ?Sized,
{
    let what = format!("pipeline {}", id);
    let found = active(&what, timeout)
        .wait_for_state(move || async move { api.get_pipeline(id).await.map(pipeline_status) })
        .await?;
    expect_found(found, &what)
}

/// Wait for a pipeline to disappear.
#[instrument(skip(api))]
pub async fn wait_for_pipeline_deleted<A>(api: &A, id: &str, timeout: Duration) -> Result<(), ProviderError>
where
    A: TelemetryApi + ?Sized,
{
    deleted(&format!("pipeline {}", id), timeout)
        .wait_for_state(move || async move { api.get_pipeline(id).await.map(pipeline_status) })
        .await?;
    Ok(())
}
