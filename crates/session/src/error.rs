//! Unified error handling with Sentry integration.
//!
//! Provides an `AppError` that front ends (the CLI, a UI shell) return from
//! their command handlers. [`AppError::report`] captures infrastructure
//! failures to Sentry and maps every error to a process exit code.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::provider::ProviderError;
use crate::services::auth::AuthError;
use crate::storage::StorageError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Profile store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Auth provider operation failed.
    #[error("Auth provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(e))
    }
}

impl AppError {
    /// Whether this is an infrastructure failure rather than a user error.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Database(_) | Self::Migration(_) | Self::Storage(_) => true,
            Self::Provider(e) => !matches!(
                e,
                ProviderError::InvalidCredentials(_)
                    | ProviderError::EmailNotConfirmed
                    | ProviderError::InvalidCallback(_)
            ),
            Self::Auth(e) => matches!(e, AuthError::Provider(_)),
            Self::Config(_) | Self::BadRequest(_) => false,
        }
    }

    /// Log the error, capture internal failures to Sentry and return the
    /// exit code to use.
    #[must_use]
    pub fn report(&self) -> u8 {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command failed"
            );
            1
        } else {
            tracing::warn!(error = %self, "Command rejected");
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_not_internal() {
        assert!(!AppError::BadRequest("no role".to_owned()).is_internal());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_internal());
        assert!(!AppError::Provider(ProviderError::EmailNotConfirmed).is_internal());
        assert!(
            !AppError::Config(ConfigError::MissingEnvVar("TUTORHUB_AUTH_URL".to_owned()))
                .is_internal()
        );
    }

    #[test]
    fn test_infrastructure_errors_are_internal() {
        assert!(AppError::Provider(ProviderError::Unavailable("down".to_owned())).is_internal());
        assert!(
            AppError::Database(RepositoryError::Unavailable("pool closed".to_owned()))
                .is_internal()
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::BadRequest("x".to_owned()).report(), 2);
        assert_eq!(
            AppError::Provider(ProviderError::Unavailable("down".to_owned())).report(),
            1
        );
    }
}
