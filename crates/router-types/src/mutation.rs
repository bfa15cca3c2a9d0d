//! Mutation batches sent from entity providers to the catalog

use crate::entity::{Entity, EntityRef};
use serde::{Deserialize, Serialize};

/// Provenance tag naming the provider that asserted an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LocationKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// An entity paired with the location key asserting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredEntity {
    pub entity: Entity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_key: Option<LocationKey>,
}

impl DeferredEntity {
    pub fn new(entity: Entity, location_key: LocationKey) -> Self {
        Self {
            entity,
            location_key: Some(location_key),
        }
    }
}

/// Reconciliation message applied through a catalog connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MutationBatch {
    /// Complete replacement of everything the provider currently asserts
    Full { entities: Vec<DeferredEntity> },

    /// Incremental change
    Delta {
        #[serde(default)]
        added: Vec<DeferredEntity>,
        #[serde(default)]
        removed: Vec<EntityRef>,
    },
}

impl MutationBatch {
    /// Build a full batch tagging every entity with `location_key`
    pub fn full(entities: impl IntoIterator<Item = Entity>, location_key: &LocationKey) -> Self {
        MutationBatch::Full {
            entities: entities
                .into_iter()
                .map(|entity| DeferredEntity::new(entity, location_key.clone()))
                .collect(),
        }
    }

    /// Number of entities added or asserted by this batch
    pub fn len(&self) -> usize {
        match self {
            MutationBatch::Full { entities } => entities.len(),
            MutationBatch::Delta { added, .. } => added.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MutationBatch::Full { entities } => entities.is_empty(),
            MutationBatch::Delta { added, removed } => added.is_empty() && removed.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_batch_wire_shape() {
        let key = LocationKey::new("routerEntityProvider");
        let batch = MutationBatch::full(
            vec![Entity::new("backstage.io/v1alpha1", "Component", "a")],
            &key,
        );

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["type"], "full");
        assert_eq!(json["entities"][0]["locationKey"], "routerEntityProvider");
        assert_eq!(json["entities"][0]["entity"]["metadata"]["name"], "a");
    }

    #[test]
    fn test_full_batch_tags_every_entity() {
        let key = LocationKey::new("p");
        let batch = MutationBatch::full(
            ["a", "b", "c"].map(|n| Entity::new("v1", "Component", n)),
            &key,
        );

        let MutationBatch::Full { entities } = &batch else {
            panic!("expected full batch");
        };
        assert_eq!(batch.len(), 3);
        assert!(entities.iter().all(|e| e.location_key.as_ref() == Some(&key)));
    }

    #[test]
    fn test_delta_emptiness() {
        let batch = MutationBatch::Delta {
            added: vec![],
            removed: vec![EntityRef::user("gone")],
        };
        assert!(!batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
