//! Session layer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TUTORHUB_AUTH_URL` - Base URL of the hosted auth service
//! - `TUTORHUB_ANON_KEY` - Public API key sent with every auth request
//! - `TUTORHUB_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `TUTORHUB_STORAGE_PATH` - Local storage file (default: .tutorhub/local_storage.json)
//! - `TUTORHUB_REDIRECT_TIMEOUT_MS` - Redirect guard safety timeout (default: 2000)
//! - `TUTORHUB_REDIRECT_SETTLE_MS` - How long a redirect holds the guard (default: 300)
//! - `TUTORHUB_SESSION_TIMEOUT_SECS` - Bound on the initial session fetch, 0 disables (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = ".tutorhub/local_storage.json";
const DEFAULT_REDIRECT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_REDIRECT_SETTLE_MS: u64 = 300;
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Full configuration for binaries using the session layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hosted auth service settings
    pub auth: AuthServiceConfig,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// File backing persistent local storage
    pub storage_path: PathBuf,
    /// Timing knobs for the bootstrapper and redirect guard
    pub bootstrap: BootstrapOptions,
    /// Error tracking settings
    pub sentry: SentryConfig,
}

/// Sentry settings. Both optional; no DSN means Sentry stays disabled.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN for error tracking
    pub dsn: Option<String>,
    /// Sentry environment name
    pub environment: Option<String>,
}

/// Hosted auth service settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AuthServiceConfig {
    /// Base URL, e.g. `https://project.example.co`
    pub url: Url,
    /// Public API key
    pub anon_key: SecretString,
}

impl std::fmt::Debug for AuthServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthServiceConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Timing knobs for session bootstrap and redirect guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Longest a redirect flight may hold the guard before it is force-released.
    pub redirect_timeout: Duration,
    /// How long a completed redirect keeps the guard so trailing events settle.
    pub redirect_settle: Duration,
    /// Bound on the initial authoritative session fetch; `None` waits forever.
    pub session_timeout: Option<Duration>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            redirect_timeout: Duration::from_millis(DEFAULT_REDIRECT_TIMEOUT_MS),
            redirect_settle: Duration::from_millis(DEFAULT_REDIRECT_SETTLE_MS),
            session_timeout: Some(Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS)),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            auth: AuthServiceConfig::from_env()?,
            database_url: get_database_url("TUTORHUB_DATABASE_URL")?,
            storage_path: storage_path_from_env(),
            bootstrap: BootstrapOptions::from_env()?,
            sentry: SentryConfig::from_env(),
        })
    }
}

impl SentryConfig {
    /// Read `SENTRY_DSN` and `SENTRY_ENVIRONMENT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
        }
    }
}

/// Local storage file from `TUTORHUB_STORAGE_PATH`, or the default.
///
/// Commands that only touch local storage use this without loading the
/// rest of the configuration.
#[must_use]
pub fn storage_path_from_env() -> PathBuf {
    PathBuf::from(get_env_or_default(
        "TUTORHUB_STORAGE_PATH",
        DEFAULT_STORAGE_PATH,
    ))
}

impl AuthServiceConfig {
    /// Load only the auth service settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or key is missing, or the URL is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("TUTORHUB_AUTH_URL")?;
        let url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("TUTORHUB_AUTH_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            url,
            anon_key: SecretString::from(get_required_env("TUTORHUB_ANON_KEY")?),
        })
    }
}

impl BootstrapOptions {
    fn from_env() -> Result<Self, ConfigError> {
        let redirect_timeout = parse_u64("TUTORHUB_REDIRECT_TIMEOUT_MS", DEFAULT_REDIRECT_TIMEOUT_MS)?;
        let redirect_settle = parse_u64("TUTORHUB_REDIRECT_SETTLE_MS", DEFAULT_REDIRECT_SETTLE_MS)?;
        let session_timeout = parse_u64("TUTORHUB_SESSION_TIMEOUT_SECS", DEFAULT_SESSION_TIMEOUT_SECS)?;

        Self::from_parts(redirect_timeout, redirect_settle, session_timeout)
    }

    fn from_parts(
        redirect_timeout_ms: u64,
        redirect_settle_ms: u64,
        session_timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        if redirect_settle_ms >= redirect_timeout_ms {
            return Err(ConfigError::InvalidEnvVar(
                "TUTORHUB_REDIRECT_SETTLE_MS".to_string(),
                format!("must be shorter than the redirect timeout ({redirect_timeout_ms} ms)"),
            ));
        }

        Ok(Self {
            redirect_timeout: Duration::from_millis(redirect_timeout_ms),
            redirect_settle: Duration::from_millis(redirect_settle_ms),
            session_timeout: (session_timeout_secs > 0)
                .then(|| Duration::from_secs(session_timeout_secs)),
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

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an unsigned integer variable, falling back to `default` when unset.
fn parse_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
            }),
        Err(_) => Ok(default),
    }
}
