//! Cleanup of resources left behind by acceptance tests.
//!
//! A sweep lists every remote resource of one type, keeps those whose name
//! starts with a prefix (and, for zonal types, that live in the configured
//! zone), and deletes them one at a time. The first deletion failure aborts
//! the sweep; resources not reached yet are left alone.
//!
//! Deletion is sequential on purpose. Test sweeps touch tens of resources,
//! and a single failure usually means credentials or the API are broken, so
//! failing fast with the name of the resource that broke is more useful than
//! aggregating a wall of identical errors.
//!
//! # Dry run
//!
//! Setting `HEMMER_SWEEP_DRY_RUN=1` makes every sweep log what it would
//! delete without deleting anything. The variable is read once at the start
//! of each sweep unless the config pins [`DryRun::Enabled`] or
//! [`DryRun::Disabled`].
//!
//! # Example
//!
//! ```ignore
//! use hemmer_provider_convergence::sweep::{SweeperConfig, SweeperRegistry};
//!
//! let mut registry = SweeperRegistry::new();
//! registry.register(ClusterSweeper::new(client.clone()), SweeperConfig::zonal("test-acc-", "eu-north1-a"));
//! registry.register(VpcSweeper::new(client), SweeperConfig::global("test-acc-"));
//! registry.run_all().await?;
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::error::ProviderError;

/// Environment variable holding the process-wide dry-run toggle.
pub const DRY_RUN_ENV: &str = "HEMMER_SWEEP_DRY_RUN";

/// Default bound on a whole sweep of one resource type.
pub const DEFAULT_SWEEP_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Lists and deletes the remote resources of one type.
///
/// Implementations wrap an RPC client. [`SweepSource::delete`] must be
/// idempotent: a resource that is already gone is a success, so that an
/// interrupted sweep can simply be run again.
#[async_trait]
pub trait SweepSource: Send + Sync {
    /// The remote resource type.
    type Resource: Send + Sync;

    /// Name of the resource type, used in logs and errors.
    fn resource_type(&self) -> &str;

    /// List every resource of this type visible to the caller.
    async fn list(&self) -> Result<Vec<Self::Resource>, ProviderError>;

    /// The resource's name, matched against the sweep prefix.
    fn name(&self, resource: &Self::Resource) -> String;

    /// The resource's zone. Global resource types can keep the default.
    fn zone(&self, resource: &Self::Resource) -> Option<String> {
        let _ = resource;
        None
    }

    /// Delete a resource, treating not-found as success.
    async fn delete(&self, resource: &Self::Resource) -> Result<(), ProviderError>;
}

/// Whether a sweep deletes what it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DryRun {
    /// Read [`DRY_RUN_ENV`] at the start of the sweep.
    #[default]
    FromEnv,
    /// Only log matches.
    Enabled,
    /// Delete matches.
    Disabled,
}

impl DryRun {
    /// Resolve to a concrete on/off value.
    pub fn is_enabled(self) -> bool {
        match self {
            DryRun::Enabled => true,
            DryRun::Disabled => false,
            DryRun::FromEnv => std::env::var(DRY_RUN_ENV)
                .map(|value| parse_toggle(&value))
                .unwrap_or(false),
        }
    }
}

fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Which resources a sweep targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Literal, case-sensitive name prefix.
    pub prefix: String,
    /// Zone to sweep. Required unless `global_resource` is set.
    pub zone: Option<String>,
    /// The resource type has no zone; `zone` is ignored.
    pub global_resource: bool,
    /// Bound on the whole sweep, listing included.
    pub timeout: Duration,
    /// Dry-run mode.
    pub dry_run: DryRun,
}

impl SweeperConfig {
    /// Sweep a zone-scoped resource type.
    pub fn zonal(prefix: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            zone: Some(zone.into()),
            global_resource: false,
            timeout: DEFAULT_SWEEP_TIMEOUT,
            dry_run: DryRun::default(),
        }
    }

    /// Sweep a global resource type.
    pub fn global(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            zone: None,
            global_resource: true,
            timeout: DEFAULT_SWEEP_TIMEOUT,
            dry_run: DryRun::default(),
        }
    }

    /// Set the sweep timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pin dry-run mode instead of reading the environment.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = if dry_run {
            DryRun::Enabled
        } else {
            DryRun::Disabled
        };
        self
    }

    /// Reject configurations that would silently sweep nothing.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if !self.global_resource && self.zone.as_deref().map_or(true, str::is_empty) {
            return Err(ProviderError::Configuration(
                "zone is required to sweep a zone-scoped resource type".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProviderError::Configuration(
                "sweep timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a resource with this name and zone is swept.
    pub fn matches(&self, name: &str, zone: Option<&str>) -> bool {
        if !name.starts_with(&self.prefix) {
            return false;
        }
        self.global_resource || (zone.is_some() && zone == self.zone.as_deref())
    }
}

/// Delete every resource from `source` that `config` matches.
#[instrument(skip_all, fields(resource_type = %source.resource_type(), prefix = %config.prefix))]
pub async fn sweep<S>(source: &S, config: &SweeperConfig) -> Result<(), ProviderError>
where
    S: SweepSource + ?Sized,
{
    config.validate()?;
    let dry_run = config.dry_run.is_enabled();
    let resource_type = source.resource_type().to_string();
    let in_flight: Mutex<Option<String>> = Mutex::new(None);

    let run = async {
        let resources = source
            .list()
            .await
            .map_err(|err| ProviderError::SweepList {
                resource_type: resource_type.clone(),
                source: Box::new(err),
            })?;
        let listed = resources.len();

        let matching: Vec<_> = resources
            .iter()
            .filter(|resource| {
                config.matches(&source.name(resource), source.zone(resource).as_deref())
            })
            .collect();
        debug!(listed, matched = matching.len(), "listed resources");

        if dry_run {
            for resource in &matching {
                info!(
                    name = %source.name(resource),
                    zone = source.zone(resource).as_deref().unwrap_or("-"),
                    "dry run: would delete"
                );
            }
            return Ok(());
        }

        for resource in matching {
            let name = source.name(resource);
            info!(name = %name, "deleting");
            *lock(&in_flight) = Some(name.clone());
            source
                .delete(resource)
                .await
                .map_err(|err| ProviderError::SweepDelete {
                    resource_type: resource_type.clone(),
                    name: name.clone(),
                    source: Box::new(err),
                })?;
            *lock(&in_flight) = None;
        }
        Ok::<_, ProviderError>(())
    };

    let result = tokio::time::timeout(config.timeout, run).await;
    match result {
        Ok(result) => result,
        Err(elapsed) => {
            let timed_out = ProviderError::Timeout {
                operation: format!("sweep of {}", resource_type),
                timeout: config.timeout,
                last_state: None,
                source: elapsed,
            };
            // A deletion in flight owns the timeout.
            match lock(&in_flight).take() {
                Some(name) => Err(ProviderError::SweepDelete {
                    resource_type,
                    name,
                    source: Box::new(timed_out),
                }),
                None => Err(timed_out),
            }
        },
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
trait RegisteredSweeper: Send + Sync {
    async fn run(&self) -> Result<(), ProviderError>;
}

struct Registration<S> {
    source: S,
    config: SweeperConfig,
}

#[async_trait]
impl<S: SweepSource> RegisteredSweeper for Registration<S> {
    async fn run(&self) -> Result<(), ProviderError> {
        sweep(&self.source, &self.config).await
    }
}

/// One sweeper per resource type, run by the acceptance-test driver.
#[derive(Default)]
pub struct SweeperRegistry {
    sweepers: BTreeMap<String, Box<dyn RegisteredSweeper>>,
}

impl SweeperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sweeper under its source's resource type, replacing any
    /// earlier registration for that type.
    pub fn register<S>(&mut self, source: S, config: SweeperConfig) -> &mut Self
    where
        S: SweepSource + 'static,
    {
        let resource_type = source.resource_type().to_string();
        self.sweepers
            .insert(resource_type, Box::new(Registration { source, config }));
        self
    }

    /// Registered resource types, in the order [`SweeperRegistry::run_all`] visits them.
    pub fn resource_types(&self) -> Vec<String> {
        self.sweepers.keys().cloned().collect()
    }

    /// Run the sweeper registered for `resource_type`.
    pub async fn run(&self, resource_type: &str) -> Result<(), ProviderError> {
        match self.sweepers.get(resource_type) {
            Some(sweeper) => sweeper.run().await,
            None => Err(ProviderError::Configuration(format!(
                "no sweeper registered for {}",
                resource_type
            ))),
        }
    }

    /// Run every registered sweeper, stopping at the first failure.
    pub async fn run_all(&self) -> Result<(), ProviderError> {
        for (resource_type, sweeper) in &self.sweepers {
            debug!(resource_type = %resource_type, "running sweeper");
            sweeper.run().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_sweep_delete_failed, FakeResource, InMemorySweepSource};

    fn resources() -> Vec<FakeResource> {
        vec![
            FakeResource::zonal("test-acc-1", "A"),
            FakeResource::zonal("prod-1", "A"),
            FakeResource::zonal("test-acc-2", "B"),
        ]
    }

    #[tokio::test]
    async fn test_zonal_sweep_filters_by_prefix_and_zone() {
        let source = InMemorySweepSource::new("widget", resources());
        let config = SweeperConfig::zonal("test-acc-", "A").with_dry_run(false);

        sweep(&source, &config).await.unwrap();

        assert_eq!(source.deleted(), vec!["test-acc-1"]);
        assert_eq!(source.remaining(), vec!["prod-1", "test-acc-2"]);
    }

    #[tokio::test]
    async fn test_global_sweep_ignores_zone() {
        let source = InMemorySweepSource::new("widget", resources());
        let mut config = SweeperConfig::global("test-acc-").with_dry_run(false);
        config.zone = Some("A".to_string());

        sweep(&source, &config).await.unwrap();

        assert_eq!(source.deleted(), vec!["test-acc-1", "test-acc-2"]);
    }

    #[tokio::test]
    async fn test_prefix_is_literal_and_case_sensitive() {
        let source = InMemorySweepSource::new(
            "widget",
            vec![
                FakeResource::global("TEST-ACC-1"),
                FakeResource::global("test-acc*"),
                FakeResource::global("test-acc-3"),
            ],
        );
        let config = SweeperConfig::global("test-acc-").with_dry_run(false);

        sweep(&source, &config).await.unwrap();

        assert_eq!(source.deleted(), vec!["test-acc-3"]);
    }

    #[tokio::test]
    async fn test_dry_run_deletes_nothing() {
        let source = InMemorySweepSource::new("widget", resources());
        let config = SweeperConfig::zonal("test-acc-", "A").with_dry_run(true);

        sweep(&source, &config).await.unwrap();

        assert!(source.deleted().is_empty());
        assert_eq!(source.delete_calls(), 0);
        assert_eq!(source.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_first_delete_failure_stops_sweep() {
        let source = InMemorySweepSource::new(
            "widget",
            vec![
                FakeResource::global("test-acc-1"),
                FakeResource::global("test-acc-2"),
            ],
        )
        .fail_delete(
            "test-acc-1",
            ProviderError::PermissionDenied("token expired".to_string()),
        );
        let config = SweeperConfig::global("test-acc-").with_dry_run(false);

        let result = sweep(&source, &config).await;

        assert_sweep_delete_failed(result, "test-acc-1");
        assert_eq!(source.delete_calls(), 1);
        assert_eq!(source.remaining(), vec!["test-acc-1", "test-acc-2"]);
    }

    #[tokio::test]
    async fn test_missing_zone_is_configuration_error() {
        let source = InMemorySweepSource::new("widget", resources());
        let config = SweeperConfig::zonal("test-acc-", "");

        let err = sweep(&source, &config).await.unwrap_err();

        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(source.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_failure_aborts() {
        let source = InMemorySweepSource::new("widget", resources())
            .fail_list(ProviderError::Unavailable("down".to_string()));
        let config = SweeperConfig::zonal("test-acc-", "A").with_dry_run(false);

        let err = sweep(&source, &config).await.unwrap_err();

        assert!(matches!(err, ProviderError::SweepList { ref resource_type, .. } if resource_type == "widget"));
        assert_eq!(source.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_sweeps_converge() {
        let source = InMemorySweepSource::new("widget", resources());
        let config = SweeperConfig::zonal("test-acc-", "A").with_dry_run(false);

        sweep(&source, &config).await.unwrap();
        sweep(&source, &config).await.unwrap();

        assert_eq!(source.deleted(), vec!["test-acc-1"]);
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_registry_runs_each_type() {
        let mut registry = SweeperRegistry::new();
        registry
            .register(
                InMemorySweepSource::new("widget", resources()),
                SweeperConfig::zonal("test-acc-", "A").with_dry_run(false),
            )
            .register(
                InMemorySweepSource::new("gadget", vec![FakeResource::global("test-acc-g")]),
                SweeperConfig::global("test-acc-").with_dry_run(false),
            );

        assert_eq!(registry.resource_types(), vec!["gadget", "widget"]);
        registry.run_all().await.unwrap();
        registry.run("widget").await.unwrap();

        let err = registry.run("sprocket").await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("1"));
        assert!(parse_toggle("TRUE"));
        assert!(parse_toggle(" yes "));
        assert!(parse_toggle("on"));
        assert!(!parse_toggle("0"));
        assert!(!parse_toggle(""));
        assert!(!parse_toggle("false"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_names_resource_being_deleted() {
        let source = InMemorySweepSource::new(
            "widget",
            vec![
                FakeResource::global("test-acc-1"),
                FakeResource::global("test-acc-2"),
            ],
        )
        .with_delete_delay(Duration::from_secs(20 * 60));
        let config = SweeperConfig::global("test-acc-").with_dry_run(false);

        let err = assert_sweep_delete_failed(sweep(&source, &config).await, "test-acc-2");

        match err {
            ProviderError::SweepDelete { source: cause, .. } => assert!(cause.is_timeout()),
            other => panic!("Expected a sweep delete error, got: {:?}", other),
        }
        assert_eq!(source.deleted(), vec!["test-acc-1"]);
        assert_eq!(source.delete_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_while_listing_is_plain_timeout() {
        let source = InMemorySweepSource::new("widget", Vec::new())
            .with_list_delay(Duration::from_secs(60));
        let config = SweeperConfig::global("test-acc-")
            .with_dry_run(false)
            .with_timeout(Duration::from_secs(30));

        let err = sweep(&source, &config).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "sweep of widget: timed out after 30s");
    }

    #[tokio::test]
    async fn test_dry_run_from_environment() {
        std::env::set_var(DRY_RUN_ENV, "1");
        let source = InMemorySweepSource::new("widget", resources());
        let result = sweep(&source, &SweeperConfig::zonal("test-acc-", "A")).await;
        std::env::remove_var(DRY_RUN_ENV);

        result.unwrap();
        assert_eq!(source.list_calls(), 1);
        assert_eq!(source.delete_calls(), 0);
        assert_eq!(source.remaining(), vec!["test-acc-1", "prod-1", "test-acc-2"]);
    }

    #[test]
    fn test_pinned_dry_run_ignores_env() {
        assert!(DryRun::Enabled.is_enabled());
        assert!(!DryRun::Disabled.is_enabled());
    }
}
