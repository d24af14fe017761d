//! Object storage buckets and their configuration.
//!
//! Bucket settings (versioning, access policy, lifecycle rules) have no
//! status label to wait on. Each `apply_*` operation submits the desired
//! value and then polls it back until the remote reports an equivalent
//! configuration; each `delete_*` operation removes the setting and polls
//! until the remote reports it missing.
//!
//! While waiting for a write to become visible, transient errors and
//! not-found reads count as "not yet". Any other error aborts the wait.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::ignore_not_found;
use crate::compare::lifecycle::LifecycleConfiguration;
use crate::compare::policy::PolicyDocument;
use crate::compare::VersioningStatus;
use crate::converge::{wait_for_absence, wait_for_convergence};
use crate::error::ProviderError;
use crate::message::ToMessage;
use crate::poll::PollOptions;
use crate::proto;

/// Client for the bucket API.
#[async_trait]
pub trait BucketApi: Send + Sync {
    /// Succeeds while the bucket exists.
    async fn head_bucket(&self, bucket: &str) -> Result<(), ProviderError>;

    /// Current versioning status.
    async fn get_versioning(&self, bucket: &str) -> Result<VersioningStatus, ProviderError>;

    /// Change the versioning status.
    async fn put_versioning(
        &self,
        request: proto::PutBucketVersioningRequest,
    ) -> Result<(), ProviderError>;

    /// Current access policy as JSON; [`ProviderError::NotFound`] if none is set.
    async fn get_policy(&self, bucket: &str) -> Result<String, ProviderError>;

    /// Replace the access policy.
    async fn put_policy(&self, request: proto::PutBucketPolicyRequest) -> Result<(), ProviderError>;

    /// Remove the access policy.
    async fn delete_policy(&self, bucket: &str) -> Result<(), ProviderError>;

    /// Current lifecycle rules; [`ProviderError::NotFound`] if none are set.
    async fn get_lifecycle(&self, bucket: &str) -> Result<LifecycleConfiguration, ProviderError>;

    /// Replace the lifecycle rules.
    async fn put_lifecycle(
        &self,
        request: proto::PutBucketLifecycleRequest,
    ) -> Result<(), ProviderError>;

    /// Remove all lifecycle rules.
    async fn delete_lifecycle(&self, bucket: &str) -> Result<(), ProviderError>;
}

fn options(timeout: Duration) -> PollOptions {
    PollOptions::new().with_timeout(timeout)
}

/// Set the versioning status and wait until it reads back.
#[instrument(skip(api))]
pub async fn apply_bucket_versioning<A>(
    api: &A,
    bucket: &str,
    status: VersioningStatus,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    let mut request = status.to_message()?;
    request.bucket = bucket.to_string();
    api.put_versioning(request).await?;
    wait_for_bucket_versioning(api, bucket, status, timeout).await
}

/// Wait until the versioning status reads back as `desired`.
pub async fn wait_for_bucket_versioning<A>(
    api: &A,
    bucket: &str,
    desired: VersioningStatus,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    wait_for_convergence(
        &format!("bucket {} versioning to become {}", bucket, desired),
        &options(timeout),
        &desired,
        move || api.get_versioning(bucket),
    )
    .await
}

/// Replace the access policy and wait until an equivalent document reads back.
#[instrument(skip(api, policy))]
pub async fn apply_bucket_policy<A>(
    api: &A,
    bucket: &str,
    policy: &PolicyDocument,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    let request = proto::PutBucketPolicyRequest {
        bucket: bucket.to_string(),
        policy: Some(policy.to_message()?),
    };
    api.put_policy(request).await?;
    wait_for_bucket_policy(api, bucket, policy, timeout).await
}

/// Wait until the access policy reads back equivalent to `desired`.
pub async fn wait_for_bucket_policy<A>(
    api: &A,
    bucket: &str,
    desired: &PolicyDocument,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    wait_for_convergence(
        &format!("bucket {} policy to converge", bucket),
        &options(timeout),
        desired,
        move || async move {
            let json = api.get_policy(bucket).await?;
            PolicyDocument::from_json(&json)
        },
    )
    .await
}

/// Remove the access policy and wait until it is gone.
#[instrument(skip(api))]
pub async fn delete_bucket_policy<A>(api: &A, bucket: &str, timeout: Duration) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    ignore_not_found(api.delete_policy(bucket).await)?;
    wait_for_bucket_policy_deleted(api, bucket, timeout).await
}

/// Wait until the remote reports no access policy.
pub async fn wait_for_bucket_policy_deleted<A>(
    api: &A,
    bucket: &str,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    wait_for_absence(
        &format!("bucket {} policy to be deleted", bucket),
        &options(timeout),
        move || api.get_policy(bucket),
    )
    .await
}

/// Replace the lifecycle rules and wait until an equivalent set reads back.
///
/// An empty rule set removes the lifecycle configuration instead, since the
/// remote reports an empty configuration as not found.
#[instrument(skip(api, configuration), fields(rules = configuration.rules.len()))]
pub async fn apply_bucket_lifecycle<A>(
    api: &A,
    bucket: &str,
    configuration: &LifecycleConfiguration,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    if configuration.rules.is_empty() {
        debug!("no lifecycle rules, removing configuration");
        return delete_bucket_lifecycle(api, bucket, timeout).await;
    }
    let request = proto::PutBucketLifecycleRequest {
        bucket: bucket.to_string(),
        configuration: Some(configuration.to_message()?),
    };
    api.put_lifecycle(request).await?;
    wait_for_bucket_lifecycle(api, bucket, configuration, timeout).await
}

/// Wait until the lifecycle rules read back equivalent to `desired`.
pub async fn wait_for_bucket_lifecycle<A>(
    api: &A,
    bucket: &str,
    desired: &LifecycleConfiguration,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    wait_for_convergence(
        &format!("bucket {} lifecycle to converge", bucket),
        &options(timeout),
        desired,
        move || api.get_lifecycle(bucket),
    )
    .await
}

/// Remove the lifecycle rules and wait until they are gone.
#[instrument(skip(api))]
pub async fn delete_bucket_lifecycle<A>(
    api: &A,
    bucket: &str,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    ignore_not_found(api.delete_lifecycle(bucket).await)?;
    wait_for_bucket_lifecycle_deleted(api, bucket, timeout).await
}

/// Wait until the remote reports no lifecycle rules.
pub async fn wait_for_bucket_lifecycle_deleted<A>(
    api: &A,
    bucket: &str,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    wait_for_absence(
        &format!("bucket {} lifecycle to be deleted", bucket),
        &options(timeout),
        move || api.get_lifecycle(bucket),
    )
    .await
}

/// Wait until the bucket itself is gone.
pub async fn wait_for_bucket_deleted<A>(
    api: &A,
    bucket: &str,
    timeout: Duration,
) -> Result<(), ProviderError>
where
    A: BucketApi + ?Sized,
{
    wait_for_absence(
        &format!("bucket {} to be deleted", bucket),
        &options(timeout),
        move || api.head_bucket(bucket),
    )
    .await
}
