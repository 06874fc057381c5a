//! Profile reconciliation.
//!
//! Given an authenticated identity, find its profile or synthesize one from
//! sign-up metadata. Running it twice for the same identity yields the same
//! profile: the second run finds the row the first one inserted, or
//! synthesizes the identical record again if that insert failed.

use tutorhub_core::{Identity, Profile};

use crate::db::RepositoryError;
use crate::ports::ProfileStore;

/// Derive the profile for `identity`.
///
/// - Existing row: returned as-is.
/// - No row: a profile is synthesized, an insert is attempted once, and the
///   synthesized profile is returned whether or not the insert succeeded.
/// - Lookup failure: logged and treated as "no profile yet" (`None`).
pub async fn reconcile_profile(store: &dyn ProfileStore, identity: &Identity) -> Option<Profile> {
    match store.find_by_id(&identity.id).await {
        Ok(Some(profile)) => {
            tracing::debug!(user_id = %identity.id, role = %profile.role, "Loaded profile");
            Some(profile)
        }
        Ok(None) => Some(create_from_metadata(store, identity).await),
        Err(e) => {
            tracing::warn!(user_id = %identity.id, error = %e, "Profile lookup failed");
            None
        }
    }
}

async fn create_from_metadata(store: &dyn ProfileStore, identity: &Identity) -> Profile {
    let profile = Profile::synthesize(identity);
    tracing::info!(
        user_id = %profile.id,
        role = %profile.role,
        "No profile found, creating one from sign-up metadata"
    );

    match store.insert(&profile).await {
        Ok(_) => {}
        Err(RepositoryError::Conflict(message)) => {
            // Another reconciliation inserted it first.
            tracing::debug!(user_id = %profile.id, %message, "Profile already created");
        }
        Err(e) => {
            tracing::error!(
                user_id = %profile.id,
                error = %e,
                "Failed to persist synthesized profile; using it for this visit only"
            );
        }
    }

    profile
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryProfileStore;
    use tutorhub_core::{Role, UserId};

    fn ann() -> Identity {
        let mut identity = Identity::new("u1", None);
        identity.metadata.full_name = Some("Ann".to_owned());
        identity.metadata.role = Some("mentor".to_owned());
        identity
    }

    #[tokio::test]
    async fn test_existing_profile_is_returned() {
        let stored = Profile {
            id: UserId::new("u1"),
            email: "ann@school.edu".to_owned(),
            full_name: "Ann Lee".to_owned(),
            role: Role::Admin,
            phone: None,
        };
        let store = InMemoryProfileStore::with_profiles([stored.clone()]);

        assert_eq!(reconcile_profile(&store, &ann()).await, Some(stored));
        assert_eq!(store.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_missing_profile_is_synthesized_and_inserted() {
        let store = InMemoryProfileStore::new();

        let profile = reconcile_profile(&store, &ann()).await.unwrap();
        assert_eq!(profile.role, Role::Mentor);
        assert_eq!(profile.full_name, "Ann");
        assert_eq!(store.get(&UserId::new("u1")), Some(profile));
    }

    #[tokio::test]
    async fn test_insert_failure_still_returns_profile() {
        let store = InMemoryProfileStore::new();
        store.fail_inserts(true);

        let first = reconcile_profile(&store, &ann()).await;
        let second = reconcile_profile(&store, &ann()).await;
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(store.insert_attempts(), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_no_profile() {
        let store = InMemoryProfileStore::new();
        store.fail_lookups(true);

        assert_eq!(reconcile_profile(&store, &ann()).await, None);
        assert_eq!(store.insert_attempts(), 0);
    }
}
