//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SUPABASE_URL` - Base URL of the managed backend (auth + storage)
//! - `SUPABASE_ANON_KEY` - Public API key sent with identity provider calls
//! - `SUPABASE_SERVICE_ROLE_KEY` - Server-side key used for storage uploads
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `APP_ENV` - Environment name reported by `/health` (default: development)
//! - `STORAGE_BUCKET` - Bucket holding product images (default: food-images)
//! - `MAX_IMAGE_BYTES` - Upload ceiling for product images (default: 5 MiB)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins (default: <http://localhost:3000>)
//! - `FRONTEND_URL` - Extra allowed origin for the deployed frontend
//! - `IDENTITY_CACHE_TTL_SECS` - How long a verified token is trusted (default: 30)
//! - `UPSTREAM_TIMEOUT_SECS` - Timeout for identity/storage calls (default: 10)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default upload ceiling for product images (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Managed backend (identity provider + blob store) configuration
    pub supabase: SupabaseConfig,
    /// Largest accepted product image, in bytes
    pub max_image_bytes: usize,
    /// Origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
    /// How long a resolved access token is cached
    pub identity_cache_ttl: Duration,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Managed backend configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: Url,
    /// Public (anon) API key
    pub anon_key: SecretString,
    /// Service-role key (server-side only)
    pub service_role_key: SecretString,
    /// Storage bucket for product images
    pub storage_bucket: String,
    /// Timeout applied to every outbound call
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("service_role_key", &"[REDACTED]")
            .field("storage_bucket", &self.storage_bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the service-role key fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = parse_env("HOST", "0.0.0.0")?;
        let port = parse_env("PORT", "5000")?;
        let environment = get_env_or_default("APP_ENV", "development");
        let supabase = SupabaseConfig::from_env()?;
        let max_image_bytes = parse_env("MAX_IMAGE_BYTES", &DEFAULT_MAX_IMAGE_BYTES.to_string())?;
        let identity_cache_ttl = Duration::from_secs(parse_env("IDENTITY_CACHE_TTL_SECS", "30")?);

        let mut cors_origins = parse_origins(&get_env_or_default(
            "CORS_ALLOWED_ORIGINS",
            "http://localhost:3000",
        ));
        if let Some(frontend) = get_optional_env("FRONTEND_URL") {
            cors_origins.push(frontend.trim_end_matches('/').to_owned());
        }

        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            supabase,
            max_image_bytes,
            cors_origins,
            identity_cache_ttl,
            json_logs,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_owned(), e.to_string()))?;

        Ok(Self {
            url,
            anon_key: get_required_secret("SUPABASE_ANON_KEY")?,
            service_role_key: get_validated_secret("SUPABASE_SERVICE_ROLE_KEY")?,
            storage_bucket: get_env_or_default("STORAGE_BUCKET", "food-images"),
            timeout: Duration::from_secs(parse_env("UPSTREAM_TIMEOUT_SECS", "10")?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-service-role-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins(" http://localhost:3000/ ,,https://app.example.org");
        assert_eq!(
            origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://app.example.org".to_string()
            ]
        );
    }

    #[test]
    fn test_supabase_config_debug_redacts_secrets() {
        let config = SupabaseConfig {
            url: Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: SecretString::from("anon_key_value"),
            service_role_key: SecretString::from("super_secret_service_key"),
            storage_bucket: "food-images".to_string(),
            timeout: Duration::from_secs(1),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("abc.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon_key_value"));
        assert!(!debug_output.contains("super_secret_service_key"));
    }
}
