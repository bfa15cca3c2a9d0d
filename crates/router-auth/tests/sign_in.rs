//! Router sign-in resolver against a mock catalog backend

use async_trait::async_trait;
use reqwest::Client;
use router_auth::{
    AuthError, AuthProviderRegistry, AuthResult, AuthService, CatalogSignInContext,
    ExternalProfile, HostDiscovery, OAuthResult, PluginToken, RouterSignInResolver,
    ServiceCredentials, SignInError, SignInResolver, StaticTokenAuthService,
};
use router_catalog::InMemoryCatalog;
use router_types::Entity;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct BrokenAuth;

#[async_trait]
impl AuthService for BrokenAuth {
    async fn get_own_service_credentials(&self) -> AuthResult<ServiceCredentials> {
        Ok(ServiceCredentials {
            principal: "plugin:auth".to_string(),
        })
    }

    async fn get_plugin_request_token(
        &self,
        _on_behalf_of: &ServiceCredentials,
        _target_plugin_id: &str,
    ) -> AuthResult<PluginToken> {
        Err(AuthError::Unavailable("token issuer down".to_string()))
    }
}

fn catalog_token_auth() -> Arc<StaticTokenAuthService> {
    Arc::new(StaticTokenAuthService::new(HashMap::from([(
        "catalog".to_string(),
        "s3cret".to_string(),
    )])))
}

fn resolver(auth: Arc<dyn AuthService>, backend: &str) -> RouterSignInResolver {
    let http = Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    RouterSignInResolver::new(auth, Arc::new(HostDiscovery::new(backend)), http)
}

async fn context() -> CatalogSignInContext {
    let catalog = InMemoryCatalog::new();
    catalog
        .insert(Entity::new("backstage.io/v1alpha1", "User", "u123"))
        .await
        .unwrap();
    CatalogSignInContext::new(Arc::new(catalog))
}

fn github_result(id: &str) -> OAuthResult {
    OAuthResult::for_profile(ExternalProfile::new(id))
}

#[tokio::test]
async fn resolves_user_when_router_endpoint_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/catalog/router"))
        .and(header("authorization", "Bearer s3cret"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "entity router provider" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let identity = resolver(catalog_token_auth(), &server.uri())
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap();

    assert_eq!(identity.user_entity_ref, "user:default/u123");
}

#[tokio::test]
async fn resolves_user_when_router_endpoint_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/catalog/router"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let identity = resolver(catalog_token_auth(), &server.uri())
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap();

    assert_eq!(identity.user_entity_ref, "user:default/u123");
}

#[tokio::test]
async fn resolves_user_when_router_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/catalog/router"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let identity = resolver(catalog_token_auth(), &server.uri())
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap();

    assert_eq!(identity.user_entity_ref, "user:default/u123");
}

#[tokio::test]
async fn resolves_user_when_router_endpoint_is_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/catalog/router"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let identity = resolver(catalog_token_auth(), &server.uri())
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap();

    assert_eq!(identity.user_entity_ref, "user:default/u123");
}

#[tokio::test]
async fn resolves_user_when_catalog_is_unreachable() {
    let identity = resolver(catalog_token_auth(), "http://127.0.0.1:1")
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap();

    assert_eq!(identity.user_entity_ref, "user:default/u123");
}

#[tokio::test]
async fn credential_failure_aborts_before_any_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = resolver(Arc::new(BrokenAuth), &server.uri())
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap_err();

    assert!(matches!(err, SignInError::CredentialExchange(_)));
}

#[tokio::test]
async fn missing_token_for_catalog_aborts_sign_in() {
    let auth = Arc::new(StaticTokenAuthService::new(HashMap::new()));

    let err = resolver(auth, "http://127.0.0.1:1")
        .resolve(&github_result("u123"), &context().await)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SignInError::CredentialExchange(AuthError::NoTokenForTarget(t)) if t == "catalog"
    ));
}

#[tokio::test]
async fn profile_id_is_used_verbatim() {
    let server = MockServer::start().await;

    let err = resolver(catalog_token_auth(), &server.uri())
        .resolve(&github_result("U123 "), &context().await)
        .await
        .unwrap_err();

    assert!(matches!(err, SignInError::IdentityUnresolved(r) if r == "user:default/U123 "));
}

#[tokio::test]
async fn github_provider_signs_in_through_registry() {
    let server = MockServer::start().await;
    let mut registry = AuthProviderRegistry::new();
    registry
        .register_provider("github", Arc::new(resolver(catalog_token_auth(), &server.uri())))
        .unwrap();

    let identity = registry
        .sign_in("github", &github_result("u123"), &context().await)
        .await
        .unwrap();

    assert_eq!(
        identity.ownership_entity_refs,
        vec!["user:default/u123".to_string()]
    );
}
