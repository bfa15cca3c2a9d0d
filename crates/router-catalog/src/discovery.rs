//! Entity discovery sources
//!
//! A discovery source returns the complete current entity set of an external
//! system (never a delta). Sources hold no mutable state between calls.

use crate::error::DiscoveryError;
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, Url};
use router_types::Entity;

/// Produces the full current set of entities known to an external system
#[async_trait]
pub trait EntityDiscoverySource: Send + Sync {
    async fn discover(&self) -> Result<Vec<Entity>, DiscoveryError>;
}

/// Fixed entity list
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverySource {
    entities: Vec<Entity>,
}

impl StaticDiscoverySource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Source that never discovers anything
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityDiscoverySource for StaticDiscoverySource {
    async fn discover(&self) -> Result<Vec<Entity>, DiscoveryError> {
        Ok(self.entities.clone())
    }
}

/// Fetches a JSON array of entities from a URL
#[derive(Debug, Clone)]
pub struct HttpDiscoverySource {
    client: Client,
    url: Url,
}

impl HttpDiscoverySource {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl EntityDiscoverySource for HttpDiscoverySource {
    async fn discover(&self) -> Result<Vec<Entity>, DiscoveryError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Entity>>()
            .await
            .map_err(|e| DiscoveryError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn source_for(server: &MockServer) -> HttpDiscoverySource {
        let url = Url::parse(&format!("{}/entities", server.uri())).unwrap();
        HttpDiscoverySource::new(Client::new(), url)
    }

    #[tokio::test]
    async fn test_static_source_is_repeatable() {
        let source = StaticDiscoverySource::new(vec![Entity::new("v1", "Component", "a")]);
        assert_eq!(source.discover().await.unwrap().len(), 1);
        assert_eq!(source.discover().await.unwrap().len(), 1);
        assert!(StaticDiscoverySource::empty().discover().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_source_parses_entities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/entities"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "apiVersion": "v1", "kind": "Component", "metadata": { "name": "a" } },
                { "apiVersion": "v1", "kind": "Component", "metadata": { "name": "b" } }
            ])))
            .mount(&server)
            .await;

        let entities = source_for(&server).await.discover().await.unwrap();
        let names: Vec<_> = entities.iter().map(|e| e.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_http_source_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = source_for(&server).await.discover().await.unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::Status {
                status: 503,
                body: "down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_http_source_reports_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
            .mount(&server)
            .await;

        let err = source_for(&server).await.discover().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Malformed(_)));
    }
}
