//! Service discovery: plugin id to base URL

use crate::error::ServiceDiscoveryError;
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;

/// Resolves the base URL of a backend plugin's API
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    async fn get_base_url(&self, plugin_id: &str) -> Result<Url, ServiceDiscoveryError>;
}

/// Host-based discovery: `{base_url}/api/{plugin_id}` unless overridden
#[derive(Debug, Clone)]
pub struct HostDiscovery {
    base_url: String,
    endpoints: HashMap<String, String>,
}

impl HostDiscovery {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            endpoints: HashMap::new(),
        }
    }

    /// Override the URL for one plugin
    pub fn with_endpoint(mut self, plugin_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints.insert(
            plugin_id.into(),
            url.into().trim_end_matches('/').to_string(),
        );
        self
    }
}

#[async_trait]
impl DiscoveryService for HostDiscovery {
    async fn get_base_url(&self, plugin_id: &str) -> Result<Url, ServiceDiscoveryError> {
        let raw = match self.endpoints.get(plugin_id) {
            Some(url) => url.clone(),
            None => format!("{}/api/{}", self.base_url, plugin_id),
        };

        Url::parse(&raw).map_err(|e| ServiceDiscoveryError {
            plugin: plugin_id.to_string(),
            reason: format!("invalid URL '{}': {}", raw, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_layout() {
        let discovery = HostDiscovery::new("http://localhost:7007/");
        let url = discovery.get_base_url("catalog").await.unwrap();
        assert_eq!(url.as_str(), "http://localhost:7007/api/catalog");
    }

    #[tokio::test]
    async fn test_endpoint_override() {
        let discovery = HostDiscovery::new("http://localhost:7007")
            .with_endpoint("catalog", "http://catalog.internal:8080/api/catalog/");
        let url = discovery.get_base_url("catalog").await.unwrap();
        assert_eq!(url.as_str(), "http://catalog.internal:8080/api/catalog");

        let other = discovery.get_base_url("search").await.unwrap();
        assert_eq!(other.as_str(), "http://localhost:7007/api/search");
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let err = HostDiscovery::new("not a url")
            .get_base_url("catalog")
            .await
            .unwrap_err();
        assert_eq!(err.plugin, "catalog");
    }
}
