//! HTTP routes exposed by the router entity provider

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

/// Body returned by `GET /router`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStatusResponse {
    pub message: String,
}

/// Fixed acknowledgement that the provider's routes are mounted
pub async fn router_status() -> Json<RouterStatusResponse> {
    Json(RouterStatusResponse {
        message: "entity router provider".to_string(),
    })
}

/// Router serving `GET /router`; no authentication is applied
pub fn status_router() -> Router {
    Router::new().route("/router", get(router_status))
}
