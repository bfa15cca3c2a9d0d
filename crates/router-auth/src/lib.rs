//! Delegated sign-in resolution for the router entity provider
//!
//! The [`RouterSignInResolver`] is registered for the `github` auth provider.
//! It exchanges a catalog-scoped service token, makes an advisory call to the
//! catalog's router endpoint and resolves the session to a catalog user.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod context;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod profile;
pub mod registry;
pub mod resolver;

pub use context::{CatalogSignInContext, CatalogUserQuery, SignInContext, SignInIdentity};
pub use credentials::{
    AuthService, PluginToken, ServiceCredentials, StaticTokenAuthService, AUTH_PLUGIN_PRINCIPAL,
};
pub use discovery::{DiscoveryService, HostDiscovery};
pub use error::{
    AuthError, AuthResult, DiagnosticCallError, ServiceDiscoveryError, SignInError, SignInResult,
};
pub use profile::{ExternalProfile, OAuthResult, OAuthSession};
pub use registry::{AuthProviderRegistry, GITHUB_PROVIDER_ID};
pub use resolver::{RouterSignInResolver, SignInResolver, CATALOG_PLUGIN_ID};
