//! In-memory catalog
//!
//! Ownership is tracked per provider. A full batch from provider P is
//! authoritative for everything P asserts: entities P owned before and that
//! are absent from the new batch are evicted. An entity already owned by
//! another provider under a different location key is left alone.

use crate::connection::{CatalogReader, EntityProvider, EntityProviderConnection};
use crate::error::{CatalogError, CatalogResult, ProviderResult};
use async_trait::async_trait;
use router_types::{DeferredEntity, Entity, EntityRef, LocationKey, MutationBatch};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A stored entity and its provenance
#[derive(Debug, Clone)]
struct StoredEntity {
    entity: Entity,
    provider: String,
    location_key: Option<LocationKey>,
}

/// Counts produced by applying one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationSummary {
    pub upserted: usize,
    pub removed: usize,
    pub conflicts: usize,
}

/// In-memory catalog for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entities: Arc<RwLock<HashMap<String, StoredEntity>>>,
    providers: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection that applies mutations on behalf of `provider`
    pub fn connection_for(&self, provider: impl Into<String>) -> Arc<dyn EntityProviderConnection> {
        Arc::new(ProviderConnection {
            catalog: self.clone(),
            provider: provider.into(),
        })
    }

    /// Register a provider and hand it its connection
    pub async fn add_entity_provider(&self, provider: Arc<dyn EntityProvider>) -> ProviderResult<()> {
        let name = provider.provider_name().to_string();
        {
            let mut providers = self.providers.write().await;
            if !providers.insert(name.clone()) {
                return Err(CatalogError::DuplicateProvider(name).into());
            }
        }

        info!(provider = %name, "Connecting entity provider");
        if let Err(e) = provider.connect(self.connection_for(name.clone())).await {
            self.providers.write().await.remove(&name);
            return Err(e);
        }
        Ok(())
    }

    /// Entities currently owned by `provider`
    pub async fn entities_for_provider(&self, provider: &str) -> Vec<Entity> {
        let entities = self.entities.read().await;
        let mut owned: Vec<_> = entities
            .values()
            .filter(|stored| stored.provider == provider)
            .map(|stored| stored.entity.clone())
            .collect();
        owned.sort_by_key(|e| e.entity_ref().key());
        owned
    }

    /// Location key recorded for an entity
    pub async fn location_key_of(&self, entity_ref: &EntityRef) -> Option<LocationKey> {
        let entities = self.entities.read().await;
        entities
            .get(&entity_ref.key())
            .and_then(|stored| stored.location_key.clone())
    }

    /// Insert an entity outside of any provider (seed data)
    ///
    /// Entities owned by a provider are refused; only that provider's
    /// mutations may replace them.
    pub async fn insert(&self, entity: Entity) -> CatalogResult<()> {
        validate(&entity)?;
        let entity_ref = entity.entity_ref();
        let key = entity_ref.key();
        let mut entities = self.entities.write().await;
        if let Some(existing) = entities.get(&key).filter(|stored| !stored.provider.is_empty()) {
            return Err(CatalogError::Owned {
                entity: entity_ref.to_string(),
                owner: existing.provider.clone(),
            });
        }
        entities.insert(
            key,
            StoredEntity {
                entity,
                provider: String::new(),
                location_key: None,
            },
        );
        Ok(())
    }

    /// Apply a batch on behalf of `provider`
    pub async fn apply(&self, provider: &str, batch: MutationBatch) -> CatalogResult<MutationSummary> {
        match batch {
            MutationBatch::Full { entities } => self.apply_full(provider, entities).await,
            MutationBatch::Delta { added, removed } => {
                self.apply_delta(provider, added, removed).await
            }
        }
    }

    async fn apply_full(
        &self,
        provider: &str,
        batch: Vec<DeferredEntity>,
    ) -> CatalogResult<MutationSummary> {
        for deferred in &batch {
            validate(&deferred.entity)?;
        }

        let mut entities = self.entities.write().await;
        let mut summary = MutationSummary::default();
        let mut asserted = HashSet::with_capacity(batch.len());

        for deferred in batch {
            let key = deferred.entity.entity_ref().key();
            if upsert(&mut entities, provider, deferred) {
                summary.upserted += 1;
                asserted.insert(key);
            } else {
                summary.conflicts += 1;
            }
        }

        let before = entities.len();
        entities.retain(|key, stored| stored.provider != provider || asserted.contains(key));
        summary.removed = before - entities.len();

        debug!(
            provider = %provider,
            upserted = summary.upserted,
            removed = summary.removed,
            conflicts = summary.conflicts,
            "Applied full mutation"
        );

        Ok(summary)
    }

    async fn apply_delta(
        &self,
        provider: &str,
        added: Vec<DeferredEntity>,
        removed: Vec<EntityRef>,
    ) -> CatalogResult<MutationSummary> {
        for deferred in &added {
            validate(&deferred.entity)?;
        }

        let mut entities = self.entities.write().await;
        let mut summary = MutationSummary::default();

        for deferred in added {
            if upsert(&mut entities, provider, deferred) {
                summary.upserted += 1;
            } else {
                summary.conflicts += 1;
            }
        }

        for entity_ref in removed {
            let key = entity_ref.key();
            if entities.get(&key).is_some_and(|stored| stored.provider == provider) {
                entities.remove(&key);
                summary.removed += 1;
            }
        }

        debug!(
            provider = %provider,
            upserted = summary.upserted,
            removed = summary.removed,
            conflicts = summary.conflicts,
            "Applied delta mutation"
        );

        Ok(summary)
    }
}

/// Insert or replace unless another provider owns the entity under a
/// different location key; returns whether the entity was written
fn upsert(entities: &mut HashMap<String, StoredEntity>, provider: &str, deferred: DeferredEntity) -> bool {
    let entity_ref = deferred.entity.entity_ref();
    let key = entity_ref.key();

    if let Some(existing) = entities.get(&key) {
        let foreign = existing.provider != provider;
        if foreign && existing.location_key != deferred.location_key {
            warn!(
                provider = %provider,
                entity = %entity_ref,
                owner = %existing.provider,
                "Entity is already owned by another provider, keeping existing"
            );
            return false;
        }
    }

    entities.insert(
        key,
        StoredEntity {
            entity: deferred.entity,
            provider: provider.to_string(),
            location_key: deferred.location_key,
        },
    );
    true
}

fn validate(entity: &Entity) -> CatalogResult<()> {
    if entity.kind.trim().is_empty() {
        return Err(CatalogError::InvalidEntity(format!(
            "entity '{}' has no kind",
            entity.metadata.name
        )));
    }
    if entity.metadata.name.trim().is_empty() {
        return Err(CatalogError::InvalidEntity(format!(
            "{} entity has no name",
            entity.kind
        )));
    }
    Ok(())
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn get_entity_by_ref(&self, entity_ref: &EntityRef) -> CatalogResult<Option<Entity>> {
        let entities = self.entities.read().await;
        Ok(entities.get(&entity_ref.key()).map(|stored| stored.entity.clone()))
    }

    async fn list_entities(&self) -> CatalogResult<Vec<Entity>> {
        let entities = self.entities.read().await;
        Ok(entities.values().map(|stored| stored.entity.clone()).collect())
    }
}

/// Connection bound to one provider name
struct ProviderConnection {
    catalog: InMemoryCatalog,
    provider: String,
}

#[async_trait]
impl EntityProviderConnection for ProviderConnection {
    async fn apply_mutation(&self, batch: MutationBatch) -> CatalogResult<()> {
        self.catalog.apply(&self.provider, batch).await.map(|_| ())
    }
}
