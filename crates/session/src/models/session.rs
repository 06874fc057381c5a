//! Published session state.
//!
//! The bootstrapper owns the only writer; everything else observes it
//! through a `tokio::sync::watch` receiver.

use tutorhub_core::{Identity, Profile, Role};

/// Where the currently published state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateSource {
    /// Nothing published yet.
    #[default]
    Empty,
    /// Restored from the local cache for an early first paint.
    Cache,
    /// Derived from the auth service. Never overwritten by cache.
    Authoritative,
}

/// Identity and profile as currently known to the application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// May lag the identity; consumers must tolerate identity without profile.
    pub profile: Option<Profile>,
    pub source: StateSource,
    /// True until the first authoritative fetch finishes, fails or times out.
    pub loading: bool,
}

impl SessionState {
    /// Initial state before the cache has been read.
    #[must_use]
    pub fn restoring() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Whether an identity is published.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Profile role, falling back to the identity's role hint.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile
            .as_ref()
            .map(|profile| profile.role)
            .or_else(|| self.identity.as_ref().and_then(Identity::role_hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_core::UserId;

    #[test]
    fn test_role_prefers_profile() {
        let mut identity = Identity::new("u1", None);
        identity.metadata.role = Some("mentor".to_owned());

        let mut state = SessionState {
            identity: Some(identity),
            ..SessionState::default()
        };
        assert_eq!(state.role(), Some(Role::Mentor));

        state.profile = Some(Profile {
            id: UserId::new("u1"),
            email: String::new(),
            full_name: String::new(),
            role: Role::Admin,
            phone: None,
        });
        assert_eq!(state.role(), Some(Role::Admin));
    }

    #[test]
    fn test_restoring_is_loading_and_signed_out() {
        let state = SessionState::restoring();
        assert!(state.loading);
        assert!(!state.is_signed_in());
        assert_eq!(state.role(), None);
    }
}
