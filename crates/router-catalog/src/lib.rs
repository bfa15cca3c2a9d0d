//! Router entity provider for the software catalog
//!
//! A [`RouterEntityProvider`] periodically discovers the full entity set of an
//! external source and applies it to the catalog as a single full mutation,
//! so the provider's slice of the catalog always mirrors the last successful
//! discovery. [`InMemoryCatalog`] is the in-process catalog the daemon and the
//! sign-in resolver read from.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod api;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod memory;
pub mod provider;

pub use api::{router_status, status_router, RouterStatusResponse};
pub use config::RouterProviderConfig;
pub use connection::{CatalogReader, EntityProvider, EntityProviderConnection};
pub use discovery::{EntityDiscoverySource, HttpDiscoverySource, StaticDiscoverySource};
pub use error::{CatalogError, CatalogResult, DiscoveryError, ProviderError, ProviderResult};
pub use memory::{InMemoryCatalog, MutationSummary};
pub use provider::{ProviderState, RefreshOutcome, RouterEntityProvider, ROUTER_PROVIDER_NAME};
