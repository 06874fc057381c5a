//! In-memory profile store for tests and offline development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use tutorhub_core::{Profile, UserId};

use super::RepositoryError;
use crate::ports::ProfileStore;

/// Profile store holding rows in a map.
///
/// Lookups and inserts can be made to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: Mutex<HashMap<UserId, Profile>>,
    fail_lookups: AtomicBool,
    fail_inserts: AtomicBool,
    insert_attempts: AtomicUsize,
}

impl InMemoryProfileStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `profiles`.
    #[must_use]
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.lock().unwrap_or_else(PoisonError::into_inner);
            for profile in profiles {
                rows.insert(profile.id.clone(), profile);
            }
        }
        store
    }

    /// Make every lookup fail with `Unavailable`.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make every insert fail with `Unavailable`.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of insert calls, successful or not.
    #[must_use]
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Snapshot of a stored row.
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<Profile> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("lookups disabled".to_owned()));
        }
        Ok(self.get(id))
    }

    async fn insert(&self, profile: &Profile) -> Result<Profile, RepositoryError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("inserts disabled".to_owned()));
        }

        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        if rows.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        rows.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tutorhub_core::Role;

    fn profile(id: &str) -> Profile {
        Profile {
            id: UserId::new(id),
            email: String::new(),
            full_name: "Test".to_owned(),
            role: Role::Student,
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = InMemoryProfileStore::new();
        store.insert(&profile("u1")).await.unwrap();

        let found = store.find_by_id(&UserId::new("u1")).await.unwrap();
        assert_eq!(found, Some(profile("u1")));
        assert_eq!(store.insert_attempts(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemoryProfileStore::with_profiles([profile("u1")]);
        let result = store.insert(&profile("u1")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryProfileStore::new();
        store.fail_lookups(true);
        store.fail_inserts(true);

        assert!(store.find_by_id(&UserId::new("u1")).await.is_err());
        assert!(store.insert(&profile("u1")).await.is_err());
        assert_eq!(store.insert_attempts(), 1);
    }
}
