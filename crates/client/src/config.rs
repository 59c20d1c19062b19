//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CAMPUS_PRINT_API_URL` - Base URL of the print-shop backend
//!
//! ## Optional
//! - `CAMPUS_PRINT_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `CAMPUS_PRINT_MAX_FILE_BYTES` - Largest accepted upload (default: 25 MiB)
//! - `CAMPUS_PRINT_MAX_CART_FILES` - Most entries in one cart (default: 20)
//! - `CAMPUS_PRINT_ALLOWED_TYPES` - Comma-separated MIME types
//!   (default: `application/pdf,image/png,image/jpeg`)
//! - `CAMPUS_PRINT_STATE_DIR` - Directory for the persisted session
//!   (default: `.campus-print`)
//! - `CAMPUS_PRINT_USERS_CACHE_SECS` - TTL of the cached user list (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::store::FileLimits;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USERS_CACHE_SECS: u64 = 300;
const DEFAULT_STATE_DIR: &str = ".campus-print";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are joined onto it
    pub api_url: Url,
    /// Timeout applied to every backend request
    pub timeout: Duration,
    /// Upload and cart size limits
    pub limits: FileLimits,
    /// Where the session storage keeps `user` and `token`
    pub state_dir: PathBuf,
    /// How long the admin user list stays cached
    pub users_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Configuration with defaults for everything except the backend URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            limits: FileLimits::default(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            users_cache_ttl: Duration::from_secs(DEFAULT_USERS_CACHE_SECS),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the backend URL is missing or any variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("CAMPUS_PRINT_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("CAMPUS_PRINT_API_URL".to_string()))?;
        let api_url = parse_base_url(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CAMPUS_PRINT_API_URL".to_string(), e))?;

        let mut config = Self::new(api_url);
        let defaults = FileLimits::default();

        config.timeout = Duration::from_secs(parse_or(
            &lookup,
            "CAMPUS_PRINT_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        if config.timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "CAMPUS_PRINT_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        config.users_cache_ttl = Duration::from_secs(parse_or(
            &lookup,
            "CAMPUS_PRINT_USERS_CACHE_SECS",
            DEFAULT_USERS_CACHE_SECS,
        )?);

        config.limits = FileLimits {
            max_file_bytes: parse_or(
                &lookup,
                "CAMPUS_PRINT_MAX_FILE_BYTES",
                defaults.max_file_bytes,
            )?,
            max_cart_entries: parse_or(
                &lookup,
                "CAMPUS_PRINT_MAX_CART_FILES",
                defaults.max_cart_entries,
            )?,
            allowed_mime_types: lookup("CAMPUS_PRINT_ALLOWED_TYPES")
                .map_or(defaults.allowed_mime_types, |list| parse_list(&list)),
        };

        if let Some(dir) = lookup("CAMPUS_PRINT_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        config.sentry_dsn = lookup("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty());

        Ok(config)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, making sure it ends in `/` so `Url::join` appends paths
/// instead of replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Split a comma-separated list, dropping blanks and lowercasing entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}
