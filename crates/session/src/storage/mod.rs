//! Key-value storage adapters.
//!
//! - [`FileStore`] - Persistent local storage backed by a JSON file
//! - [`MemoryStore`] - Process-scoped storage (session storage, tests)
//!
//! Values are opaque strings; cached records are stored as JSON. A missing
//! key or an unparseable value is always treated as a cache miss.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::ports::KeyValueStore;

/// Storage keys.
pub mod keys {
    /// Cached auth service identity (JSON `Identity`).
    pub const CACHED_USER: &str = "tutorhub.cached_user";

    /// Cached application profile (JSON `Profile`).
    pub const CACHED_PROFILE: &str = "tutorhub.cached_profile";

    /// Role override written by login and password-reset flows.
    pub const STORED_ROLE: &str = "tutorhub.stored_role";

    /// Role last confirmed by an authoritative profile.
    pub const CONFIRMED_ROLE: &str = "tutorhub.confirmed_role";

    /// Hosted auth client's persisted token.
    pub const AUTH_TOKEN: &str = "tutorhub.auth_token";

    /// Session-scoped marker mirroring the redirect guard.
    pub const REDIRECT_IN_PROGRESS: &str = "tutorhub.redirect_in_progress";

    /// Keys cleared on sign-out.
    pub const SIGN_OUT_CLEARS: [&str; 4] = [CACHED_USER, CACHED_PROFILE, STORED_ROLE, CONFIRMED_ROLE];
}

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read and decode a JSON value, treating every failure as a miss.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read from storage");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key, error = %e, "Ignoring unparseable cached value");
            None
        }
    }
}

/// Encode and write a JSON value. Failures are logged, never propagated.
pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|raw| store.set(key, &raw));

    if let Err(e) = result {
        tracing::warn!(key, error = %e, "Failed to write to storage");
    }
}

/// Remove a key. Failures are logged, never propagated.
pub fn remove_logged(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(key, error = %e, "Failed to remove from storage");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tutorhub_core::{Profile, Role, UserId};

    #[test]
    fn test_read_json_missing_is_none() {
        let store = MemoryStore::new();
        assert!(read_json::<Profile>(&store, keys::CACHED_PROFILE).is_none());
    }

    #[test]
    fn test_read_json_garbage_is_none() {
        let store = MemoryStore::new();
        store.set(keys::CACHED_PROFILE, "{not json").unwrap();
        assert!(read_json::<Profile>(&store, keys::CACHED_PROFILE).is_none());
    }

    #[test]
    fn test_write_then_read_profile() {
        let store = MemoryStore::new();
        let profile = Profile {
            id: UserId::new("u1"),
            email: "ann@school.edu".to_owned(),
            full_name: "Ann".to_owned(),
            role: Role::Mentor,
            phone: Some("555-0100".to_owned()),
        };

        write_json(&store, keys::CACHED_PROFILE, &profile);
        assert_eq!(read_json::<Profile>(&store, keys::CACHED_PROFILE), Some(profile));
    }
}
