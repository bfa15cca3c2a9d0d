//! Router daemon library
//!
//! This module provides the components of the `routerd` binary:
//! - Layered configuration
//! - HTTP router and error translation
//! - Server lifecycle: scheduler, catalog, entity provider and sign-in wiring

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use server::Server;
