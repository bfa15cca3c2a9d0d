//! Error types for router-auth

use router_catalog::CatalogError;
use thiserror::Error;

/// Errors raised by the service-to-service auth collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token is configured for the requested target plugin
    #[error("No service token configured for target plugin '{0}'")]
    NoTokenForTarget(String),

    /// The credential source could not issue a token
    #[error("Token issuer unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while resolving a plugin's base URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unable to resolve base URL for plugin '{plugin}': {reason}")]
pub struct ServiceDiscoveryError {
    pub plugin: String,
    pub reason: String,
}

/// Failure of the advisory diagnostic call; logged, never surfaced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticCallError {
    #[error(transparent)]
    Discovery(#[from] ServiceDiscoveryError),

    #[error("Diagnostic request failed: {0}")]
    Transport(String),

    #[error("Diagnostic endpoint returned {0}")]
    Status(u16),

    #[error("Diagnostic response is not JSON: {0}")]
    Body(String),
}

/// Errors that abort a sign-in attempt
#[derive(Debug, Error)]
pub enum SignInError {
    /// The service credential could not be obtained
    #[error("Credential exchange failed: {0}")]
    CredentialExchange(#[from] AuthError),

    /// No catalog user matches the resolved identity
    #[error("Failed to sign-in, unable to resolve user identity: {0}")]
    IdentityUnresolved(String),

    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Unknown auth provider: {0}")]
    UnknownProvider(String),

    #[error("Auth provider {0} is already registered")]
    DuplicateProvider(String),
}

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for sign-in operations
pub type SignInResult<T> = Result<T, SignInError>;
