//! Profile persistence.
//!
//! The only table touched is `profiles`, keyed by the auth service's user
//! id with a `user_role` enum column. Its migrations live in
//! `crates/session/migrations/` and are applied by `th-cli migrate`.

mod memory;
mod profiles;

pub use memory::InMemoryProfileStore;
pub use profiles::PgProfileStore;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Failure of a [`ProfileStore`](crate::ports::ProfileStore) call.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A profile with the same id already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Open a small pool for profile reads and the occasional insert.
///
/// # Errors
///
/// Returns the connection error if the first connection cannot be made
/// within the acquire timeout.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(3)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded `profiles` migrations.
///
/// # Errors
///
/// Returns the failing migration's error.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
