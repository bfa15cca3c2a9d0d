//! Sign-in resolver for the router entity provider
//!
//! For every sign-in the resolver exchanges a service token for the catalog,
//! makes an advisory call to the catalog's `/router` endpoint, and then signs
//! the user in as `user:default/<profile id>`. Only the token exchange and the
//! catalog lookup can fail the sign-in; the advisory call is logged and
//! otherwise ignored.

use crate::context::{CatalogUserQuery, SignInContext, SignInIdentity};
use crate::credentials::AuthService;
use crate::discovery::DiscoveryService;
use crate::error::{DiagnosticCallError, SignInResult};
use crate::profile::OAuthResult;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// Plugin the service token is scoped to
pub const CATALOG_PLUGIN_ID: &str = "catalog";

/// Maps a validated OAuth result onto a signed-in identity
#[async_trait]
pub trait SignInResolver: Send + Sync {
    async fn resolve(
        &self,
        result: &OAuthResult,
        ctx: &dyn SignInContext,
    ) -> SignInResult<SignInIdentity>;
}

/// Resolver that pings the router entity provider before signing in
#[derive(Clone)]
pub struct RouterSignInResolver {
    auth: Arc<dyn AuthService>,
    discovery: Arc<dyn DiscoveryService>,
    http: Client,
}

impl RouterSignInResolver {
    pub fn new(auth: Arc<dyn AuthService>, discovery: Arc<dyn DiscoveryService>, http: Client) -> Self {
        Self {
            auth,
            discovery,
            http,
        }
    }

    /// `GET {catalog}/router`, returning the JSON body on success
    async fn call_router_endpoint(&self, token: &str) -> Result<serde_json::Value, DiagnosticCallError> {
        let base = self.discovery.get_base_url(CATALOG_PLUGIN_ID).await?;
        let url = format!("{}/router", base.as_str().trim_end_matches('/'));

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| DiagnosticCallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiagnosticCallError::Status(status.as_u16()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| DiagnosticCallError::Body(e.to_string()))
    }
}

#[async_trait]
impl SignInResolver for RouterSignInResolver {
    async fn resolve(
        &self,
        result: &OAuthResult,
        ctx: &dyn SignInContext,
    ) -> SignInResult<SignInIdentity> {
        // Used verbatim; no normalization
        let name = result.full_profile.id.clone();

        let own = self.auth.get_own_service_credentials().await?;
        let token = self
            .auth
            .get_plugin_request_token(&own, CATALOG_PLUGIN_ID)
            .await?;

        match self.call_router_endpoint(&token.token).await {
            Ok(message) => info!("Response from router entity provider was: {}", message),
            Err(e) => debug!(user = %name, error = %e, "Router entity provider call failed, continuing sign-in"),
        }

        ctx.sign_in_with_catalog_user(CatalogUserQuery::by_name(name))
            .await
    }
}
