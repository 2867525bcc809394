//! Authentication service.
//!
//! Validates credentials locally, then delegates to the identity provider.
//! Nothing about the account is stored by the API.

mod error;

pub use error::AuthError;

use secrecy::SecretString;
use tracing::info;

use plated_core::Email;

use crate::identity::{IdentityResolver, SignUp};
use crate::models::{AuthSession, Registration};

/// Role stored in user metadata when the caller does not choose one.
const DEFAULT_ROLE: &str = "user";

/// Authentication service.
pub struct AuthService<'a> {
    identity: &'a IdentityResolver,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(identity: &'a IdentityResolver) -> Self {
        Self { identity }
    }

    /// Register a new account.
    ///
    /// `username` and `role` are stored as user metadata; blank values are
    /// treated as absent and the role defaults to `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::MissingPassword` if the password is empty.
    /// Returns `AuthError::Rejected` if the provider refuses the account.
    pub async fn register(
        &self,
        email: &str,
        password: String,
        username: Option<String>,
        role: Option<String>,
    ) -> Result<Registration, AuthError> {
        let email = Email::parse(email)?;
        let password = require_password(password)?;

        let request = SignUp {
            email,
            password,
            username: non_blank(username),
            role: non_blank(role).unwrap_or_else(|| DEFAULT_ROLE.to_owned()),
        };

        let registration = self.identity.provider().sign_up(&request).await?;
        info!(user_id = %registration.user.id, "user registered");
        Ok(registration)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: String) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let password = require_password(password)?;

        let session = self.identity.provider().sign_in(&email, &password).await?;
        info!(user_id = %session.user.id, "user signed in");
        Ok(session)
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the provider cannot revoke it.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        self.identity.sign_out(access_token).await?;
        Ok(())
    }
}

fn require_password(password: String) -> Result<SecretString, AuthError> {
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    Ok(SecretString::from(password))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::testing::{StaticIdentity, TEST_PASSWORD};

    fn resolver(provider: &Arc<StaticIdentity>) -> IdentityResolver {
        IdentityResolver::new(provider.clone(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_register_defaults_role_and_trims_username() {
        let provider = Arc::new(StaticIdentity::new());
        let resolver = resolver(&provider);
        let service = AuthService::new(&resolver);

        let registration = service
            .register(
                "new@example.com",
                "pw123456".to_owned(),
                Some("  chef ".to_owned()),
                Some("   ".to_owned()),
            )
            .await
            .unwrap();

        assert_eq!(registration.user.user_metadata["username"], "chef");
        assert_eq!(registration.user.user_metadata["role"], "user");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email_before_provider() {
        let provider = Arc::new(StaticIdentity::new());
        let resolver = resolver(&provider);
        let service = AuthService::new(&resolver);

        let err = service
            .register("not-an-email", "pw".to_owned(), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(provider.sign_ups(), 0);
    }

    #[tokio::test]
    async fn test_register_requires_password() {
        let provider = Arc::new(StaticIdentity::new());
        let resolver = resolver(&provider);
        let service = AuthService::new(&resolver);

        let err = service
            .register("a@example.com", String::new(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingPassword));
    }

    #[tokio::test]
    async fn test_login_maps_bad_credentials() {
        let provider = Arc::new(StaticIdentity::new());
        let resolver = resolver(&provider);
        let service = AuthService::new(&resolver);

        let err = service
            .login("a@example.com", "wrong".to_owned())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let session = service
            .login("a@example.com", TEST_PASSWORD.to_owned())
            .await
            .unwrap();
        assert!(!session.access_token.is_empty());
    }
}
