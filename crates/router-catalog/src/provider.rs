//! Router entity provider
//!
//! On `connect` the provider binds its catalog connection and hands a
//! `<name>:refresh` task to its task runner. Every run discovers the current
//! entity set and applies it as one full mutation tagged with the provider's
//! name. Failures are logged and reported as a [`RefreshOutcome`]; they never
//! leave the scheduled task, so the next tick runs normally.

use crate::api;
use crate::config::RouterProviderConfig;
use crate::connection::{EntityProvider, EntityProviderConnection};
use crate::discovery::{EntityDiscoverySource, HttpDiscoverySource, StaticDiscoverySource};
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::{Client, Url};
use router_scheduler::{ScheduleDefinition, TaskInvocation, TaskRunner, TaskScheduler};
use router_types::{MutationBatch, ProviderIdentity};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, info_span, warn, Instrument};

/// Name of the router entity provider
pub const ROUTER_PROVIDER_NAME: &str = "routerEntityProvider";

/// Lifecycle state of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// No catalog connection bound yet
    Uninitialized,
    /// Connected, waiting for the next tick
    Idle,
    /// A scheduled refresh is executing
    Running,
}

/// Result of one refresh cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// A full batch with this many entities was applied
    Applied { entities: usize },
    /// Nothing was discovered; no mutation was attempted
    Skipped,
    DiscoveryFailed { error: String },
    MutationFailed { error: String },
    NotInitialized,
    /// Failed outside discovery and mutation
    Failed { error: String },
}

impl From<&ProviderError> for RefreshOutcome {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::NotInitialized => RefreshOutcome::NotInitialized,
            ProviderError::Discovery(e) => RefreshOutcome::DiscoveryFailed {
                error: e.to_string(),
            },
            ProviderError::Mutation(e) => RefreshOutcome::MutationFailed {
                error: e.to_string(),
            },
            ProviderError::AlreadyConnected(_)
            | ProviderError::Config(_)
            | ProviderError::Scheduling(_) => RefreshOutcome::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Scheduled discovery reconciled into the catalog through full mutations
pub struct RouterEntityProvider {
    identity: ProviderIdentity,
    discovery: Arc<dyn EntityDiscoverySource>,
    task_runner: Arc<dyn TaskRunner>,
    connection: OnceLock<Arc<dyn EntityProviderConnection>>,
    running: AtomicBool,
    outcome_tx: broadcast::Sender<RefreshOutcome>,
    me: Weak<Self>,
}

impl RouterEntityProvider {
    /// Create a provider named [`ROUTER_PROVIDER_NAME`]
    pub fn new(
        discovery: Arc<dyn EntityDiscoverySource>,
        task_runner: Arc<dyn TaskRunner>,
    ) -> Arc<Self> {
        Self::with_identity(
            ProviderIdentity::new(ROUTER_PROVIDER_NAME),
            discovery,
            task_runner,
        )
    }

    /// Create a provider with an explicit identity
    pub fn with_identity(
        identity: ProviderIdentity,
        discovery: Arc<dyn EntityDiscoverySource>,
        task_runner: Arc<dyn TaskRunner>,
    ) -> Arc<Self> {
        let (outcome_tx, _) = broadcast::channel(64);

        Arc::new_cyclic(|me| Self {
            identity,
            discovery,
            task_runner,
            connection: OnceLock::new(),
            running: AtomicBool::new(false),
            outcome_tx,
            me: me.clone(),
        })
    }

    /// Build the provider from configuration, scheduling on `scheduler`
    pub fn from_config(
        config: &RouterProviderConfig,
        scheduler: &Arc<TaskScheduler>,
    ) -> ProviderResult<Arc<Self>> {
        let definition = ScheduleDefinition::from_config(&config.schedule)?;
        let task_runner = Arc::new(scheduler.create_scheduled_task_runner(definition));

        let discovery: Arc<dyn EntityDiscoverySource> = match &config.source_url {
            Some(url) => {
                let url = Url::parse(url).map_err(|e| {
                    ProviderError::Config(format!("Invalid source_url '{}': {}", url, e))
                })?;
                let client = Client::builder()
                    .timeout(Duration::from_secs(config.source_timeout_secs))
                    .build()
                    .map_err(|e| ProviderError::Config(format!("HTTP client: {}", e)))?;
                Arc::new(HttpDiscoverySource::new(client, url))
            }
            None => Arc::new(StaticDiscoverySource::empty()),
        };

        Ok(Self::new(discovery, task_runner))
    }

    /// Subscribe to refresh outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshOutcome> {
        self.outcome_tx.subscribe()
    }

    pub fn state(&self) -> ProviderState {
        if self.connection.get().is_none() {
            ProviderState::Uninitialized
        } else if self.running.load(Ordering::SeqCst) {
            ProviderState::Running
        } else {
            ProviderState::Idle
        }
    }

    /// Discover entities and apply them as a full mutation
    ///
    /// An empty discovery result skips the mutation instead of asserting an
    /// empty set, so a transient empty answer never evicts everything.
    pub async fn refresh(&self) -> ProviderResult<RefreshOutcome> {
        let connection = self.connection.get().ok_or(ProviderError::NotInitialized)?;
        let name = self.identity.name();

        info!("Discovering entities for {}", name);

        let entities = self.discovery.discover().await?;

        let outcome = if entities.is_empty() {
            warn!(
                "No entities discovered by {}, mutation not being attempted this run",
                name
            );
            RefreshOutcome::Skipped
        } else {
            let count = entities.len();
            info!(
                "Attempting to apply mutations on {} entities from the {} provider",
                count, name
            );
            connection
                .apply_mutation(MutationBatch::full(entities, &self.identity.location_key()))
                .await?;
            RefreshOutcome::Applied { entities: count }
        };

        info!("Completed refreshing entities for the {} provider", name);
        Ok(outcome)
    }

    /// Body of the scheduled task
    async fn run_scheduled_refresh(&self, task_id: &str) -> RefreshOutcome {
        let name = self.identity.name();
        let span = info_span!(
            "refresh",
            provider = %name,
            class = "RouterEntityProvider",
            task_id = %task_id,
            task_instance_id = %uuid::Uuid::new_v4(),
        );

        async {
            let _running = RunningFlag::raise(&self.running);
            let outcome = match self.refresh().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(provider = %name, error = %e, "{} refresh failed, {}", name, e);
                    RefreshOutcome::from(&e)
                }
            };

            let _ = self.outcome_tx.send(outcome.clone());
            outcome
        }
        .instrument(span)
        .await
    }

    /// HTTP routes exposed by this provider
    pub fn router(&self) -> axum::Router {
        api::status_router()
    }
}

/// Clears the running flag even when the run is cancelled by its timeout
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntityProvider for RouterEntityProvider {
    fn provider_name(&self) -> &str {
        self.identity.name()
    }

    async fn connect(&self, connection: Arc<dyn EntityProviderConnection>) -> ProviderResult<()> {
        let already_connected = || ProviderError::AlreadyConnected(self.identity.name().to_string());
        if self.connection.get().is_some() {
            return Err(already_connected());
        }

        let task_id = self.identity.refresh_task_id();
        let me = self.me.clone();
        let id = task_id.clone();

        self.task_runner
            .run(TaskInvocation::new(task_id, move || {
                let me = me.clone();
                let id = id.clone();
                async move {
                    if let Some(provider) = me.upgrade() {
                        provider.run_scheduled_refresh(&id).await;
                    }
                }
            }))
            .await?;

        self.connection.set(connection).map_err(|_| already_connected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, CatalogResult, DiscoveryError};
    use router_scheduler::{SchedulerError, SchedulerResult, TaskFn};
    use router_types::{Entity, LocationKey};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Task runner that records the task instead of scheduling it
    #[derive(Default)]
    struct CapturingRunner {
        tasks: Mutex<Vec<(String, TaskFn)>>,
        reject_next: AtomicBool,
    }

    impl CapturingRunner {
        fn task(&self) -> (String, TaskFn) {
            self.tasks.lock().unwrap()[0].clone()
        }

        async fn tick(&self) {
            let (_, func) = self.task();
            func().await;
        }
    }

    #[async_trait]
    impl TaskRunner for CapturingRunner {
        async fn run(&self, task: TaskInvocation) -> SchedulerResult<()> {
            if self.reject_next.swap(false, Ordering::SeqCst) {
                return Err(SchedulerError::DuplicateTask(task.id));
            }
            self.tasks.lock().unwrap().push((task.id, task.func));
            Ok(())
        }
    }

    /// Connection that records every batch and can be told to fail
    #[derive(Default)]
    struct RecordingConnection {
        batches: Mutex<Vec<MutationBatch>>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl EntityProviderConnection for RecordingConnection {
        async fn apply_mutation(&self, batch: MutationBatch) -> CatalogResult<()> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(CatalogError::Rejected("catalog unavailable".to_string()));
            }
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }
    }

    /// Discovery source replaying scripted answers
    struct ScriptedDiscovery {
        answers: Mutex<VecDeque<Result<Vec<Entity>, DiscoveryError>>>,
    }

    impl ScriptedDiscovery {
        fn new(answers: Vec<Result<Vec<Entity>, DiscoveryError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
            })
        }
    }

    #[async_trait]
    impl EntityDiscoverySource for ScriptedDiscovery {
        async fn discover(&self) -> Result<Vec<Entity>, DiscoveryError> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn entity(name: &str) -> Entity {
        Entity::new("backstage.io/v1alpha1", "Component", name)
    }

    async fn connected(
        discovery: Arc<dyn EntityDiscoverySource>,
    ) -> (Arc<RouterEntityProvider>, Arc<CapturingRunner>, Arc<RecordingConnection>) {
        let runner = Arc::new(CapturingRunner::default());
        let connection = Arc::new(RecordingConnection::default());
        let provider = RouterEntityProvider::new(discovery, runner.clone());
        provider.connect(connection.clone()).await.unwrap();
        (provider, runner, connection)
    }

    #[tokio::test]
    async fn test_refresh_before_connect_fails() {
        let runner = Arc::new(CapturingRunner::default());
        let provider = RouterEntityProvider::new(Arc::new(StaticDiscoverySource::empty()), runner);

        assert_eq!(provider.state(), ProviderState::Uninitialized);
        assert!(matches!(
            provider.refresh().await,
            Err(ProviderError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_connect_registers_refresh_task_once() {
        let (provider, runner, connection) =
            connected(Arc::new(StaticDiscoverySource::empty())).await;

        assert_eq!(runner.task().0, "routerEntityProvider:refresh");
        assert_eq!(provider.state(), ProviderState::Idle);
        assert!(matches!(
            provider.connect(connection).await,
            Err(ProviderError::AlreadyConnected(_))
        ));
        assert_eq!(runner.tasks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_scheduling_leaves_provider_unbound() {
        let runner = Arc::new(CapturingRunner::default());
        runner.reject_next.store(true, Ordering::SeqCst);
        let connection = Arc::new(RecordingConnection::default());
        let provider =
            RouterEntityProvider::new(Arc::new(StaticDiscoverySource::empty()), runner.clone());

        assert!(matches!(
            provider.connect(connection.clone()).await,
            Err(ProviderError::Scheduling(SchedulerError::DuplicateTask(_)))
        ));
        assert_eq!(provider.state(), ProviderState::Uninitialized);
        assert!(matches!(
            provider.refresh().await,
            Err(ProviderError::NotInitialized)
        ));

        provider.connect(connection).await.unwrap();
        assert_eq!(provider.state(), ProviderState::Idle);
        assert_eq!(runner.tasks.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_outcome_from_error() {
        let mutation = ProviderError::Mutation(CatalogError::Rejected("full".to_string()));
        assert_eq!(
            RefreshOutcome::from(&mutation),
            RefreshOutcome::MutationFailed {
                error: "Mutation rejected: full".to_string()
            }
        );

        let scheduling = ProviderError::Scheduling(SchedulerError::DuplicateTask("t".to_string()));
        assert!(matches!(
            RefreshOutcome::from(&scheduling),
            RefreshOutcome::Failed { .. }
        ));
        assert_eq!(
            RefreshOutcome::from(&ProviderError::NotInitialized),
            RefreshOutcome::NotInitialized
        );
    }

    #[tokio::test]
    async fn test_tick_applies_one_full_batch() {
        let discovery = ScriptedDiscovery::new(vec![Ok(vec![entity("a"), entity("b")])]);
        let (provider, runner, connection) = connected(discovery).await;
        let mut outcomes = provider.subscribe();

        runner.tick().await;

        let batches = connection.batches.lock().unwrap().clone();
        let key = LocationKey::new("routerEntityProvider");
        assert_eq!(
            batches,
            vec![MutationBatch::full(vec![entity("a"), entity("b")], &key)]
        );
        assert_eq!(
            outcomes.try_recv().unwrap(),
            RefreshOutcome::Applied { entities: 2 }
        );
        assert_eq!(provider.state(), ProviderState::Idle);
    }

    #[tokio::test]
    async fn test_empty_discovery_skips_mutation() {
        let (provider, runner, connection) =
            connected(Arc::new(StaticDiscoverySource::empty())).await;
        let mut outcomes = provider.subscribe();

        runner.tick().await;

        assert!(connection.batches.lock().unwrap().is_empty());
        assert_eq!(outcomes.try_recv().unwrap(), RefreshOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_discovery_failure_does_not_poison_next_cycle() {
        let discovery = ScriptedDiscovery::new(vec![
            Err(DiscoveryError::Unreachable("connection refused".to_string())),
            Ok(vec![entity("a")]),
        ]);
        let (provider, runner, connection) = connected(discovery).await;
        let mut outcomes = provider.subscribe();

        runner.tick().await;
        runner.tick().await;

        assert!(matches!(
            outcomes.try_recv().unwrap(),
            RefreshOutcome::DiscoveryFailed { .. }
        ));
        assert_eq!(
            outcomes.try_recv().unwrap(),
            RefreshOutcome::Applied { entities: 1 }
        );
        assert_eq!(connection.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mutation_failure_is_contained() {
        let discovery = ScriptedDiscovery::new(vec![Ok(vec![entity("a")]), Ok(vec![entity("a")])]);
        let (provider, runner, connection) = connected(discovery).await;
        let mut outcomes = provider.subscribe();
        connection.fail_next.store(true, Ordering::SeqCst);

        runner.tick().await;
        runner.tick().await;

        assert!(matches!(
            outcomes.try_recv().unwrap(),
            RefreshOutcome::MutationFailed { .. }
        ));
        assert_eq!(
            outcomes.try_recv().unwrap(),
            RefreshOutcome::Applied { entities: 1 }
        );
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_source_url() {
        let config: RouterProviderConfig = serde_json::from_value(serde_json::json!({
            "schedule": { "frequency": { "seconds": 10 }, "timeout": { "minutes": 1 } },
            "source_url": "not a url"
        }))
        .unwrap();

        let result = RouterEntityProvider::from_config(&config, &TaskScheduler::new());
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }
}
