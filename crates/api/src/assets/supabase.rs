//! Supabase Storage client.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, instrument};
use url::Url;

use super::{AssetKey, AssetStore, AssetStoreError};
use crate::config::SupabaseConfig;

/// [`AssetStore`] backed by a Supabase Storage bucket.
///
/// Authenticates with the service role key and uploads with `x-upsert: false`
/// so an existing object is never replaced.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: Url,
    bucket: String,
}

impl SupabaseStorage {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, AssetStoreError> {
        let key = config.service_role_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut auth_value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
            AssetStoreError::Config(format!("invalid service role key: {e}"))
        })?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let mut api_key = HeaderValue::from_str(key).map_err(|e| {
            AssetStoreError::Config(format!("invalid service role key: {e}"))
        })?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            bucket: config.storage_bucket.clone(),
        })
    }

    fn object_url(&self, key: &AssetKey) -> Result<Url, AssetStoreError> {
        Ok(self
            .base_url
            .join(&format!("storage/v1/object/{}/{key}", self.bucket))?)
    }
}

#[async_trait]
impl AssetStore for SupabaseStorage {
    #[instrument(skip(self, bytes), fields(key = %key, size = bytes.len()))]
    async fn upload(
        &self,
        key: &AssetKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AssetStoreError> {
        let response = self
            .client
            .post(self.object_url(key)?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("image stored");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        if is_duplicate(status, &message) {
            return Err(AssetStoreError::AlreadyExists(key.to_string()));
        }

        Err(AssetStoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn public_url(&self, key: &AssetKey) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.base_url.as_str().trim_end_matches('/'),
            self.bucket
        )
    }
}

/// Storage reports an existing object as 409, or as 400 with a
/// `Duplicate` error and `"statusCode": "409"` in the body. Server errors
/// never count, whatever their body says.
fn is_duplicate(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::CONFLICT {
        return true;
    }
    if !status.is_client_error() {
        return false;
    }
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    compact.contains(r#""statusCode":"409""#) || compact.contains(r#""error":"Duplicate""#)
}
