//! Identity provider pass-through.
//!
//! The API never stores credentials. Sign-up, sign-in and sign-out are
//! forwarded to the provider, and bearer tokens are resolved to an
//! [`Identity`] by asking the provider who they belong to.
//!
//! Resolved tokens are cached briefly (`IDENTITY_CACHE_TTL_SECS`) so a page
//! of cart requests costs one provider round trip. Signing out evicts the
//! token immediately.

mod gotrue;

pub use gotrue::GoTrueClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, instrument};

use plated_core::Email;

use crate::models::{AuthSession, Identity, Registration};

/// Maximum number of cached token resolutions.
const CACHE_CAPACITY: u64 = 10_000;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair was rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The provider rejected the request payload (weak password, taken email...).
    #[error("{0}")]
    Rejected(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an unexpected error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The provider's response could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// The client could not be configured.
    #[error("identity configuration error: {0}")]
    Config(String),
}

/// A sign-up request.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: Email,
    pub password: SecretString,
    pub username: Option<String>,
    /// Application role stored in user metadata (`user` unless given).
    pub role: String,
}

/// Operations delegated to the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, request: &SignUp) -> Result<Registration, IdentityError>;

    /// Exchange an email and password for a session.
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, IdentityError>;

    /// Look up the user a token belongs to. `None` if the token is invalid or expired.
    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, IdentityError>;

    /// Revoke the session behind a token.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

/// Resolves bearer tokens to identities, with a short-lived cache.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    cache: Cache<String, Identity>,
}

impl IdentityResolver {
    /// Create a resolver caching successful lookups for `ttl`.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self { provider, cache }
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Resolve a token, consulting the cache first.
    ///
    /// Rejected tokens are not cached.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be reached.
    pub async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        if let Some(identity) = self.cache.get(access_token).await {
            return Ok(Some(identity));
        }

        let identity = self.provider.get_user(access_token).await?;
        if let Some(ref identity) = identity {
            self.cache
                .insert(access_token.to_owned(), identity.clone())
                .await;
        }

        Ok(identity)
    }

    /// Evict the token and revoke it at the provider.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the sign-out.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.cache.invalidate(access_token).await;
        self.provider.sign_out(access_token).await?;
        debug!("session revoked");
        Ok(())
    }
}
