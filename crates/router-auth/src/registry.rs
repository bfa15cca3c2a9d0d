//! Registry of sign-in resolvers keyed by auth provider id

use crate::context::{SignInContext, SignInIdentity};
use crate::error::{SignInError, SignInResult};
use crate::profile::OAuthResult;
use crate::resolver::SignInResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Auth provider id the router resolver is registered under
pub const GITHUB_PROVIDER_ID: &str = "github";

/// Sign-in resolvers by provider id (e.g. `github`)
#[derive(Default, Clone)]
pub struct AuthProviderRegistry {
    resolvers: HashMap<String, Arc<dyn SignInResolver>>,
}

impl AuthProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resolver` for `provider_id`
    pub fn register_provider(
        &mut self,
        provider_id: impl Into<String>,
        resolver: Arc<dyn SignInResolver>,
    ) -> SignInResult<()> {
        let provider_id = provider_id.into();
        if self.resolvers.contains_key(&provider_id) {
            return Err(SignInError::DuplicateProvider(provider_id));
        }

        info!(provider = %provider_id, "Registered auth provider");
        self.resolvers.insert(provider_id, resolver);
        Ok(())
    }

    /// Registered provider ids, sorted
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.resolvers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run the resolver registered for `provider_id`
    pub async fn sign_in(
        &self,
        provider_id: &str,
        result: &OAuthResult,
        ctx: &dyn SignInContext,
    ) -> SignInResult<SignInIdentity> {
        let resolver = self
            .resolvers
            .get(provider_id)
            .ok_or_else(|| SignInError::UnknownProvider(provider_id.to_string()))?;

        resolver.resolve(result, ctx).await.inspect_err(|e| {
            warn!(provider = %provider_id, error = %e, "Sign-in failed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CatalogUserQuery;
    use crate::profile::ExternalProfile;
    use async_trait::async_trait;

    struct EchoResolver;

    #[async_trait]
    impl SignInResolver for EchoResolver {
        async fn resolve(
            &self,
            result: &OAuthResult,
            ctx: &dyn SignInContext,
        ) -> SignInResult<SignInIdentity> {
            ctx.sign_in_with_catalog_user(CatalogUserQuery::by_name(result.full_profile.id.clone()))
                .await
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl SignInContext for AcceptAll {
        async fn sign_in_with_catalog_user(
            &self,
            query: CatalogUserQuery,
        ) -> SignInResult<SignInIdentity> {
            let user = query.entity_ref().to_string();
            Ok(SignInIdentity {
                user_entity_ref: user.clone(),
                ownership_entity_refs: vec![user],
            })
        }
    }

    #[tokio::test]
    async fn test_dispatches_to_registered_resolver() {
        let mut registry = AuthProviderRegistry::new();
        registry.register_provider("github", Arc::new(EchoResolver)).unwrap();

        let result = OAuthResult::for_profile(ExternalProfile::new("octocat"));
        let identity = registry.sign_in("github", &result, &AcceptAll).await.unwrap();
        assert_eq!(identity.user_entity_ref, "user:default/octocat");
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let registry = AuthProviderRegistry::new();
        let result = OAuthResult::for_profile(ExternalProfile::new("octocat"));

        let err = registry.sign_in("gitlab", &result, &AcceptAll).await.unwrap_err();
        assert!(matches!(err, SignInError::UnknownProvider(p) if p == "gitlab"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = AuthProviderRegistry::new();
        registry.register_provider("github", Arc::new(EchoResolver)).unwrap();

        let err = registry
            .register_provider("github", Arc::new(EchoResolver))
            .unwrap_err();
        assert!(matches!(err, SignInError::DuplicateProvider(_)));
        assert_eq!(registry.provider_ids(), vec!["github"]);
    }
}
