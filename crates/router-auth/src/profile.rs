//! Result of an external OAuth handshake

use serde::{Deserialize, Serialize};

/// Profile returned by the external identity provider
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    /// Stable id assigned by the identity provider
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
}

impl ExternalProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// OAuth session tokens; redacted in [`Debug`]
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSession {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<u64>,
}

impl std::fmt::Debug for OAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSession")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("expires_in_seconds", &self.expires_in_seconds)
            .finish()
    }
}

/// Validated outcome of the OAuth handshake handed to a sign-in resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthResult {
    pub full_profile: ExternalProfile,
    #[serde(default)]
    pub session: OAuthSession,
}

impl OAuthResult {
    pub fn for_profile(profile: ExternalProfile) -> Self {
        Self {
            full_profile: profile,
            session: OAuthSession::default(),
        }
    }
}
