//! Error types for router-catalog

use router_scheduler::SchedulerError;
use thiserror::Error;

/// Errors raised by a catalog connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// An entity in the batch is missing its identifying fields
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// A provider with this name is already registered
    #[error("Entity provider {0} is already registered")]
    DuplicateProvider(String),

    /// The catalog rejected the batch
    #[error("Mutation rejected: {0}")]
    Rejected(String),

    /// The entity is owned by a provider and cannot be written outside it
    #[error("Entity {entity} is owned by provider {owner}")]
    Owned { entity: String, owner: String },
}

/// Errors raised while discovering entities from an external source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Source could not be reached
    #[error("Discovery source unreachable: {0}")]
    Unreachable(String),

    /// Source answered with a non-success status
    #[error("Discovery source returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Source answered with something that is not an entity list
    #[error("Malformed discovery response: {0}")]
    Malformed(String),
}

/// Errors raised by an entity provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Refresh was invoked before a catalog connection was bound
    #[error("Not initialized")]
    NotInitialized,

    /// `connect` was invoked a second time
    #[error("Entity provider {0} is already connected")]
    AlreadyConnected(String),

    /// Provider configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Mutation(#[from] CatalogError),

    #[error("Scheduling failed: {0}")]
    Scheduling(#[from] SchedulerError),
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
