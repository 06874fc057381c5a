//! Landing route commands.
//!
//! These only touch local storage, so they work without auth or database
//! configuration.
//!
//! # Environment Variables
//!
//! - `TUTORHUB_STORAGE_PATH` - Local storage file (default: .tutorhub/local_storage.json)

use std::sync::Arc;

use tutorhub_core::Role;
use tutorhub_session::config::storage_path_from_env;
use tutorhub_session::error::AppError;
use tutorhub_session::services::resolver::RoleResolver;
use tutorhub_session::storage::FileStore;

fn resolver() -> Result<RoleResolver, AppError> {
    let store = FileStore::open(storage_path_from_env())?;
    Ok(RoleResolver::new(Arc::new(store)))
}

/// Print the landing route for `role`, honoring any stored override.
///
/// # Errors
///
/// Returns `AppError::Storage` if the storage file cannot be read.
pub fn landing(role: Option<&str>) -> Result<(), AppError> {
    let resolver = resolver()?;
    if let Some(pinned) = resolver.stored_override() {
        tracing::info!(role = %pinned, "Stored role override applies");
    }

    let route = resolver.landing_route(Role::from_hint(role));

    #[allow(clippy::print_stdout)]
    {
        println!("{route}");
    }
    Ok(())
}

/// Pin the landing role.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown role and
/// `AppError::Storage` if the override cannot be written.
pub fn remember(role: &str) -> Result<(), AppError> {
    let role: Role = role
        .parse()
        .map_err(|e: tutorhub_core::ParseRoleError| AppError::BadRequest(e.to_string()))?;
    resolver()?.remember_role(role)?;

    #[allow(clippy::print_stdout)]
    {
        println!("Landing role pinned to {role} ({})", role.dashboard_root());
    }
    Ok(())
}

/// Remove the stored override.
///
/// # Errors
///
/// Returns `AppError::Storage` if the storage file cannot be opened.
pub fn forget() -> Result<(), AppError> {
    resolver()?.forget_role();

    #[allow(clippy::print_stdout)]
    {
        println!("Landing role override cleared");
    }
    Ok(())
}
