//! Service-to-service credentials
//!
//! Tokens are created per request and never cached by callers. The [`Debug`]
//! impl of [`PluginToken`] redacts the token so it cannot leak into logs.

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// Principal of the auth plugin itself
pub const AUTH_PLUGIN_PRINCIPAL: &str = "plugin:auth";

/// Credentials identifying this process as a service principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCredentials {
    pub principal: String,
}

/// Short-lived token scoped to one target plugin
#[derive(Clone, PartialEq, Eq)]
pub struct PluginToken {
    pub token: String,
}

impl std::fmt::Debug for PluginToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Issues service credentials and plugin request tokens
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Credentials of this process's own service identity
    async fn get_own_service_credentials(&self) -> AuthResult<ServiceCredentials>;

    /// Token for calling `target_plugin_id` on behalf of `on_behalf_of`
    async fn get_plugin_request_token(
        &self,
        on_behalf_of: &ServiceCredentials,
        target_plugin_id: &str,
    ) -> AuthResult<PluginToken>;
}

/// Auth service backed by statically configured per-target tokens
#[derive(Clone)]
pub struct StaticTokenAuthService {
    principal: String,
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthService {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self {
            principal: AUTH_PLUGIN_PRINCIPAL.to_string(),
            tokens,
        }
    }
}

impl std::fmt::Debug for StaticTokenAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut targets: Vec<_> = self.tokens.keys().collect();
        targets.sort();
        f.debug_struct("StaticTokenAuthService")
            .field("principal", &self.principal)
            .field("targets", &targets)
            .finish()
    }
}

#[async_trait]
impl AuthService for StaticTokenAuthService {
    async fn get_own_service_credentials(&self) -> AuthResult<ServiceCredentials> {
        Ok(ServiceCredentials {
            principal: self.principal.clone(),
        })
    }

    async fn get_plugin_request_token(
        &self,
        on_behalf_of: &ServiceCredentials,
        target_plugin_id: &str,
    ) -> AuthResult<PluginToken> {
        tracing::debug!(
            principal = %on_behalf_of.principal,
            plugin = %target_plugin_id,
            "Issuing plugin request token"
        );

        self.tokens
            .get(target_plugin_id)
            .map(|token| PluginToken {
                token: token.clone(),
            })
            .ok_or_else(|| AuthError::NoTokenForTarget(target_plugin_id.to_string()))
    }
}
