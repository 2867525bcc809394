//! Identity provider types.
//!
//! Shapes follow the provider's JSON so they can be passed through to
//! clients without re-mapping.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plated_core::UserId;

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-issued user ID; carts are keyed by it.
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Profile data supplied at sign-up (`username`, `role`).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A password-grant session.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

/// Outcome of a sign-up. `session` is absent when the provider requires
/// email confirmation before issuing tokens.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: Identity,
    pub session: Option<AuthSession>,
}
