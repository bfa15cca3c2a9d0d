//! Router Types - Catalog entity model shared by the router entity provider
//!
//! ## Key Concepts
//!
//! - **Entity**: an externally-defined catalog record keyed by `kind + namespace + name`
//! - **LocationKey**: provenance tag naming the provider that asserted an entity
//! - **MutationBatch**: a full (replace) or delta reconciliation message
//! - **ProviderIdentity**: the fixed name of a provider instance

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod entity;
pub mod mutation;
pub mod provider;

pub use entity::{Entity, EntityMeta, EntityRef, EntityRefError, DEFAULT_NAMESPACE};
pub use mutation::{DeferredEntity, LocationKey, MutationBatch};
pub use provider::ProviderIdentity;
