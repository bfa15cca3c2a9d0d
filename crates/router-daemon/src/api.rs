//! API Router configuration

use crate::config::ServerConfig;
use crate::error::ApiError;
use axum::{http::Uri, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Plugin prefix the catalog routes are mounted under
pub const CATALOG_MOUNT: &str = "/api/catalog";

/// Create the main router around the catalog plugin's routes
pub fn create_router(catalog_routes: Router, server: &ServerConfig) -> Router {
    let router = Router::new()
        .nest(CATALOG_MOUNT, catalog_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
