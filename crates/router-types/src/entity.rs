//! Catalog entity types
//!
//! The provider does not interpret entity contents beyond the identifying
//! triple; everything else is carried through as opaque JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Namespace applied when an entity or reference omits one
pub const DEFAULT_NAMESPACE: &str = "default";

/// A catalog entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Schema version of the entity envelope
    pub api_version: String,

    /// Entity kind (e.g. `User`, `Component`)
    pub kind: String,

    /// Identifying and descriptive metadata
    pub metadata: EntityMeta,

    /// Kind-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
}

/// Entity metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Entity {
    /// Create an entity with the given kind and name in the default namespace
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata: EntityMeta {
                name: name.into(),
                ..Default::default()
            },
            spec: None,
        }
    }

    /// Attach a spec payload
    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Namespace, falling back to [`DEFAULT_NAMESPACE`]
    pub fn namespace(&self) -> &str {
        self.metadata
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Stable reference to this entity
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(&self.kind, self.namespace(), &self.metadata.name)
    }
}

/// Errors raised while parsing an entity reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityRefError {
    #[error("Entity reference is empty")]
    Empty,

    #[error("Entity reference '{0}' has no kind and no default kind was given")]
    MissingKind(String),

    #[error("Entity reference '{0}' is malformed")]
    Malformed(String),
}

/// Reference to an entity by `kind:namespace/name`
///
/// Comparison inside the catalog is case-insensitive; use [`EntityRef::key`]
/// when indexing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reference to a user entity in the default namespace
    pub fn user(name: impl Into<String>) -> Self {
        Self::new("user", DEFAULT_NAMESPACE, name)
    }

    /// Parse `[kind:][namespace/]name`, filling the gaps from the defaults
    pub fn parse(
        input: &str,
        default_kind: Option<&str>,
        default_namespace: Option<&str>,
    ) -> Result<Self, EntityRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EntityRefError::Empty);
        }

        let (kind, rest) = match input.split_once(':') {
            Some((kind, rest)) => (Some(kind), rest),
            None => (None, input),
        };
        let (namespace, name) = match rest.split_once('/') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, rest),
        };

        let kind = kind
            .or(default_kind)
            .ok_or_else(|| EntityRefError::MissingKind(input.to_string()))?;
        let namespace = namespace
            .or(default_namespace)
            .unwrap_or(DEFAULT_NAMESPACE);

        if kind.is_empty() || namespace.is_empty() || name.is_empty() || name.contains(['/', ':']) {
            return Err(EntityRefError::Malformed(input.to_string()));
        }

        Ok(Self::new(kind, namespace, name))
    }

    /// Case-insensitive index key
    pub fn key(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.kind.to_lowercase(),
            self.namespace,
            self.name
        )
    }
}
