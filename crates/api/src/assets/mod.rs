//! Product image storage.
//!
//! Images are written once under a freshly generated key and never
//! overwritten; a collision is reported instead of replacing the object.

mod supabase;

pub use supabase::SupabaseStorage;

use core::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Prefix under which product images are stored.
const KEY_PREFIX: &str = "food-images";

/// Longest file extension kept in a generated key.
const MAX_EXTENSION_LEN: usize = 10;

/// Errors that can occur when talking to the blob store.
#[derive(Debug, Error)]
pub enum AssetStoreError {
    /// An object already exists under this key.
    #[error("asset already exists: {0}")]
    AlreadyExists(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The client could not be configured.
    #[error("storage configuration error: {0}")]
    Config(String),

    /// The store URL could not be built.
    #[error("invalid storage URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A store key of the form `food-images/<uuid>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    /// Generate a fresh key for an upload.
    ///
    /// The extension comes from the file name, falling back to the MIME
    /// subtype, then to `bin`. Only ASCII alphanumerics are kept.
    #[must_use]
    pub fn generate(file_name: &str, content_type: &str) -> Self {
        Self(format!(
            "{KEY_PREFIX}/{}.{}",
            Uuid::new_v4(),
            extension_for(file_name, content_type)
        ))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn extension_for(file_name: &str, content_type: &str) -> String {
    let from_name = file_name.rsplit_once('.').map(|(_, ext)| ext);
    let from_mime = content_type
        .split_once('/')
        .and_then(|(_, subtype)| subtype.split(['+', ';']).next());

    from_name
        .into_iter()
        .chain(from_mime)
        .map(sanitize_extension)
        .find(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_owned())
}

fn sanitize_extension(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Write-once blob storage for product images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `key`.
    ///
    /// Returns `AssetStoreError::AlreadyExists` instead of overwriting.
    async fn upload(
        &self,
        key: &AssetKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AssetStoreError>;

    /// Public URL at which a stored object is served.
    fn public_url(&self, key: &AssetKey) -> String;
}
