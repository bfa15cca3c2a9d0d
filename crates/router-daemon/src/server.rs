//! Server setup and lifecycle management

use crate::api::create_router;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use axum::Router;
use reqwest::Client;
use router_auth::{
    AuthProviderRegistry, CatalogSignInContext, HostDiscovery, OAuthResult, RouterSignInResolver,
    SignInIdentity, SignInResult, StaticTokenAuthService, GITHUB_PROVIDER_ID,
};
use router_catalog::{InMemoryCatalog, RouterEntityProvider};
use router_scheduler::TaskScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Router daemon server
pub struct Server {
    config: DaemonConfig,
    scheduler: Arc<TaskScheduler>,
    catalog: InMemoryCatalog,
    provider: Arc<RouterEntityProvider>,
    auth_providers: AuthProviderRegistry,
}

impl Server {
    /// Build every component and connect the entity provider
    ///
    /// Connecting schedules the provider's refresh task, so this must run
    /// inside the tokio runtime.
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let provider_config = config
            .catalog
            .providers
            .router_entity_provider
            .as_ref()
            .ok_or_else(|| {
                DaemonError::Config(
                    "Missing required config value at 'catalog.providers.router_entity_provider.schedule'"
                        .to_string(),
                )
            })?;

        let scheduler = TaskScheduler::new();
        let provider = RouterEntityProvider::from_config(provider_config, &scheduler)?;

        let catalog = InMemoryCatalog::new();
        catalog.add_entity_provider(provider.clone()).await?;

        let auth_providers = build_auth_providers(&config)?;

        Ok(Self {
            config,
            scheduler,
            catalog,
            provider,
            auth_providers,
        })
    }

    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    pub fn provider(&self) -> &Arc<RouterEntityProvider> {
        &self.provider
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// HTTP application
    pub fn router(&self) -> Router {
        create_router(self.provider.router(), &self.config.server)
    }

    /// Resolve a completed OAuth handshake for `provider_id` against the catalog
    pub async fn sign_in(&self, provider_id: &str, result: &OAuthResult) -> SignInResult<SignInIdentity> {
        let ctx = CatalogSignInContext::new(Arc::new(self.catalog.clone()));
        self.auth_providers.sign_in(provider_id, result, &ctx).await
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.router();

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Router daemon listening on {}", addr);
        tracing::info!(
            auth_providers = ?self.auth_providers.provider_ids(),
            tasks = ?self.scheduler.task_ids(),
            "Catalog backend ready"
        );

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Router daemon shutting down");

        // Stop scheduled tasks
        self.scheduler.shutdown();

        Ok(())
    }
}

fn build_auth_providers(config: &DaemonConfig) -> DaemonResult<AuthProviderRegistry> {
    let auth = Arc::new(StaticTokenAuthService::new(config.auth.service_tokens.clone()));

    let discovery = config.discovery_overrides().fold(
        HostDiscovery::new(config.backend.base_url.clone()),
        |discovery, (plugin, url)| discovery.with_endpoint(plugin, url),
    );

    let mut http = Client::builder();
    if let Some(secs) = config.auth.http_timeout_secs {
        http = http.timeout(Duration::from_secs(secs));
    }
    let http = http
        .build()
        .map_err(|e| DaemonError::Config(format!("HTTP client: {}", e)))?;

    let resolver = RouterSignInResolver::new(auth, Arc::new(discovery), http);

    let mut registry = AuthProviderRegistry::new();
    registry.register_provider(GITHUB_PROVIDER_ID, Arc::new(resolver))?;
    Ok(registry)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
