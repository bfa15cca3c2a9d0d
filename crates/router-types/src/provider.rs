//! Provider identity

use crate::mutation::LocationKey;
use serde::{Deserialize, Serialize};

/// Fixed identity of an entity provider
///
/// The name roots the provider's scheduled task id and doubles as the
/// location key on everything the provider asserts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderIdentity {
    name: String,
}

impl ProviderIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location_key(&self) -> LocationKey {
        LocationKey::new(self.name.clone())
    }

    /// Id of the provider's scheduled refresh task
    pub fn refresh_task_id(&self) -> String {
        format!("{}:refresh", self.name)
    }
}

impl std::fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
