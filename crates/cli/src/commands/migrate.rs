//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! th-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TUTORHUB_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/session/migrations/`.

use tutorhub_session::config::SessionConfig;
use tutorhub_session::db;
use tutorhub_session::error::AppError;

/// Run the profile table migrations.
///
/// # Errors
///
/// Returns `AppError` if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), AppError> {
    let config = SessionConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
