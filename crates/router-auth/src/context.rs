//! Sign-in context: maps a resolved subject onto a catalog identity

use crate::error::{SignInError, SignInResult};
use async_trait::async_trait;
use router_catalog::CatalogReader;
use router_types::{Entity, EntityRef, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which catalog user to sign in as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUserQuery {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl CatalogUserQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(
            "user",
            self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE),
            self.name.clone(),
        )
    }
}

/// Identity issued for a signed-in session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInIdentity {
    /// e.g. `user:default/u123`
    pub user_entity_ref: String,
    /// The user itself and every group it is a member of
    pub ownership_entity_refs: Vec<String>,
}

/// Per-attempt capabilities available to a sign-in resolver
#[async_trait]
pub trait SignInContext: Send + Sync {
    /// Sign in as the catalog user matching `query`
    async fn sign_in_with_catalog_user(&self, query: CatalogUserQuery)
        -> SignInResult<SignInIdentity>;
}

/// Sign-in context backed by a catalog reader
#[derive(Clone)]
pub struct CatalogSignInContext {
    catalog: Arc<dyn CatalogReader>,
}

impl CatalogSignInContext {
    pub fn new(catalog: Arc<dyn CatalogReader>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl SignInContext for CatalogSignInContext {
    async fn sign_in_with_catalog_user(
        &self,
        query: CatalogUserQuery,
    ) -> SignInResult<SignInIdentity> {
        let entity_ref = query.entity_ref();

        let user = self
            .catalog
            .get_entity_by_ref(&entity_ref)
            .await?
            .ok_or_else(|| SignInError::IdentityUnresolved(entity_ref.to_string()))?;

        let identity = identity_for(&entity_ref, &user);
        debug!(
            user = %identity.user_entity_ref,
            ownership = identity.ownership_entity_refs.len(),
            "Resolved catalog user"
        );
        Ok(identity)
    }
}

fn identity_for(entity_ref: &EntityRef, user: &Entity) -> SignInIdentity {
    let user_ref = entity_ref.to_string();
    let mut ownership = vec![user_ref.clone()];

    let member_of = user
        .spec
        .as_ref()
        .and_then(|spec| spec.get("memberOf"))
        .and_then(|v| v.as_array());

    for group in member_of.into_iter().flatten() {
        let Some(raw) = group.as_str() else {
            continue;
        };
        match EntityRef::parse(raw, Some("group"), Some(user.namespace())) {
            Ok(group_ref) => {
                let group_ref = group_ref.to_string();
                if !ownership.contains(&group_ref) {
                    ownership.push(group_ref);
                }
            }
            Err(e) => warn!(user = %user_ref, group = %raw, error = %e, "Ignoring malformed memberOf entry"),
        }
    }

    SignInIdentity {
        user_entity_ref: user_ref,
        ownership_entity_refs: ownership,
    }
}
