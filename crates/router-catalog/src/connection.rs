//! Contracts between entity providers and the catalog

use crate::error::{CatalogResult, ProviderResult};
use async_trait::async_trait;
use router_types::{Entity, EntityRef, MutationBatch};
use std::sync::Arc;

/// Write side of the catalog, bound to one provider
#[async_trait]
pub trait EntityProviderConnection: Send + Sync {
    /// Apply a mutation batch on behalf of the bound provider
    async fn apply_mutation(&self, batch: MutationBatch) -> CatalogResult<()>;
}

/// A source of entities registered with the catalog
#[async_trait]
pub trait EntityProvider: Send + Sync {
    /// Unique provider name
    fn provider_name(&self) -> &str;

    /// Bind the provider to its connection; called exactly once
    async fn connect(&self, connection: Arc<dyn EntityProviderConnection>) -> ProviderResult<()>;
}

/// Read side of the catalog
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Look up an entity by reference (case-insensitive)
    async fn get_entity_by_ref(&self, entity_ref: &EntityRef) -> CatalogResult<Option<Entity>>;

    /// List all entities
    async fn list_entities(&self) -> CatalogResult<Vec<Entity>>;
}
