//! Supabase Auth (GoTrue) REST client.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use plated_core::Email;

use super::{IdentityError, IdentityProvider, SignUp};
use crate::config::SupabaseConfig;
use crate::models::{AuthSession, Identity, Registration};

/// Longest provider error message passed through to clients.
const MAX_MESSAGE_LEN: usize = 200;

/// [`IdentityProvider`] backed by the Supabase Auth API.
///
/// Every request carries the project's anon key; user-scoped calls add the
/// caller's access token as a bearer credential.
#[derive(Clone)]
pub struct GoTrueClient {
    client: reqwest::Client,
    base_url: Url,
}

/// Sign-up answers with a session when email confirmation is off and with
/// the bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(Identity),
}

impl GoTrueClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.anon_key.expose_secret())
            .map_err(|e| IdentityError::Config(format!("invalid anon key: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path)
            .map_err(|e| IdentityError::Config(format!("invalid auth URL: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUp) -> Result<Registration, IdentityError> {
        let body = serde_json::json!({
            "email": request.email.as_str(),
            "password": request.password.expose_secret(),
            "data": {
                "username": request.username,
                "role": request.role,
            },
        });

        let response = self
            .client
            .post(self.endpoint("auth/v1/signup")?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &message));
        }

        let parsed: SignUpResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        let registration = match parsed {
            SignUpResponse::Session(session) => Registration {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::User(user) => Registration {
                user,
                session: None,
            },
        };

        debug!(user_id = %registration.user.id, "account registered");
        Ok(registration)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, IdentityError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &message));
        }

        response
            .json::<AuthSession>()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &message));
        }

        let identity = response
            .json::<Identity>()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(Some(identity))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.endpoint("auth/v1/logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        // An already-invalid token has nothing left to revoke.
        if status.is_success()
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
        {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &message))
    }
}

/// Map a non-success response to an error.
///
/// Client errors other than rate limiting carry a message meant for the
/// end user (e.g. "Password should be at least 6 characters").
fn classify_failure(status: StatusCode, body: &str) -> IdentityError {
    let message = provider_message(body);
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        return IdentityError::Rejected(message);
    }

    warn!(status = status.as_u16(), %message, "identity provider error");
    IdentityError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Extract the human-readable message from a provider error body.
fn provider_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_owned))
        });

    let message = from_json.unwrap_or_else(|| body.trim().to_owned());
    if message.is_empty() {
        return "request rejected by identity provider".to_owned();
    }
    message.chars().take(MAX_MESSAGE_LEN).collect()
}
