//! Landing route resolution.

use std::sync::Arc;

use tutorhub_core::{ROOT_PATH, Role};

use crate::ports::KeyValueStore;
use crate::storage::{keys, remove_logged};

/// Resolve where a user with `role` lands after signing in.
///
/// A valid `stored_override` always wins over `role`. Anything that is not
/// exactly `student`, `mentor` or `admin` (after trimming and unquoting)
/// resolves to the application root.
#[must_use]
pub fn resolve_landing_route(stored_override: Option<&str>, role: Option<&str>) -> &'static str {
    stored_override
        .and_then(parse_stored_role)
        .or_else(|| Role::from_hint(role))
        .map_or(ROOT_PATH, Role::dashboard_root)
}

/// Stored values may be raw (`admin`) or JSON-encoded (`"admin"`).
fn parse_stored_role(raw: &str) -> Option<Role> {
    raw.trim().trim_matches('"').parse().ok()
}

/// Role resolver bound to local storage.
#[derive(Clone)]
pub struct RoleResolver {
    local: Arc<dyn KeyValueStore>,
}

impl RoleResolver {
    /// Create a resolver reading overrides from `local`.
    #[must_use]
    pub fn new(local: Arc<dyn KeyValueStore>) -> Self {
        Self { local }
    }

    /// The stored override, if present and valid.
    #[must_use]
    pub fn stored_override(&self) -> Option<Role> {
        match self.local.get(keys::STORED_ROLE) {
            Ok(value) => value.as_deref().and_then(parse_stored_role),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored role override");
                None
            }
        }
    }

    /// Landing route for `role`, honouring the stored override.
    #[must_use]
    pub fn landing_route(&self, role: Option<Role>) -> &'static str {
        let stored = self.stored_override();
        resolve_landing_route(
            stored.map(Role::as_str),
            role.map(Role::as_str),
        )
    }

    /// Record a role override, as login and password-reset flows do.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if local storage cannot be written.
    pub fn remember_role(&self, role: Role) -> Result<(), crate::storage::StorageError> {
        self.local.set(keys::STORED_ROLE, role.as_str())
    }

    /// Drop any role override.
    pub fn forget_role(&self) {
        remove_logged(self.local.as_ref(), keys::STORED_ROLE);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_each_role_maps_to_its_dashboard() {
        assert_eq!(resolve_landing_route(None, Some("student")), "/student-dashboard");
        assert_eq!(resolve_landing_route(None, Some("mentor")), "/mentor-dashboard");
        assert_eq!(resolve_landing_route(None, Some("admin")), "/admin-dashboard");
    }

    #[test]
    fn test_unknown_or_missing_role_is_root() {
        for role in [None, Some(""), Some("tutor"), Some("ADMIN"), Some("admin-ish")] {
            assert_eq!(resolve_landing_route(None, role), "/", "role {role:?}");
        }
    }

    #[test]
    fn test_valid_override_wins() {
        for role in [None, Some("student"), Some("mentor"), Some("garbage")] {
            assert_eq!(resolve_landing_route(Some("admin"), role), "/admin-dashboard");
        }
        assert_eq!(
            resolve_landing_route(Some("\"mentor\""), Some("student")),
            "/mentor-dashboard"
        );
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        assert_eq!(
            resolve_landing_route(Some("superuser"), Some("student")),
            "/student-dashboard"
        );
        assert_eq!(resolve_landing_route(Some(""), None), "/");
    }

    #[test]
    fn test_resolver_reads_override_from_storage() {
        let local = Arc::new(MemoryStore::new());
        let resolver = RoleResolver::new(local.clone());
        assert_eq!(resolver.landing_route(Some(Role::Student)), "/student-dashboard");

        resolver.remember_role(Role::Admin).unwrap();
        assert_eq!(resolver.stored_override(), Some(Role::Admin));
        assert_eq!(resolver.landing_route(Some(Role::Student)), "/admin-dashboard");

        resolver.forget_role();
        assert_eq!(resolver.landing_route(Some(Role::Mentor)), "/mentor-dashboard");
    }
}
