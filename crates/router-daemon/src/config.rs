//! Configuration for router-daemon

use router_catalog::RouterProviderConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Where this backend is reachable by other plugins
    #[serde(default)]
    pub backend: BackendConfig,

    /// Per-plugin URL overrides for service discovery
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Catalog entity providers
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Service-to-service auth
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 7007)),
            enable_cors: true,
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// External base URL; plugins are served under `{base_url}/api/{plugin}`
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Service discovery overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub endpoints: Vec<DiscoveryEndpoint>,
}

/// Explicit base URL for one plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEndpoint {
    pub plugin: String,
    pub url: String,
}

/// `catalog` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// `catalog.providers` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Required; the daemon refuses to start without a schedule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_entity_provider: Option<RouterProviderConfig>,
}

/// Auth configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Service token per target plugin id
    #[serde(default)]
    pub service_tokens: HashMap<String, String>,

    /// Timeout for outbound calls made during sign-in; none when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut targets: Vec<_> = self.service_tokens.keys().collect();
        targets.sort();
        f.debug_struct("AuthConfig")
            .field("service_tokens", &targets)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:7007".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `ROUTERD__SECTION__KEY` environment variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ROUTERD")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Discovery overrides as `(plugin, url)` pairs
    pub fn discovery_overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.discovery
            .endpoints
            .iter()
            .map(|e| (e.plugin.as_str(), e.url.as_str()))
    }
}
