//! Configuration for the router entity provider

use router_scheduler::ScheduleDefinitionConfig;
use serde::{Deserialize, Serialize};

/// `catalog.providers.router_entity_provider`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterProviderConfig {
    /// Refresh schedule
    pub schedule: ScheduleDefinitionConfig,

    /// URL returning a JSON array of entities; nothing is discovered when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Request timeout for the discovery source in seconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
}

fn default_source_timeout() -> u64 {
    30
}
