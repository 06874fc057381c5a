//! Application-level user profile.

use serde::{Deserialize, Serialize};

use super::{Identity, Role, UserId};

/// The application's own user record, keyed by the identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the auth service identity.
    pub id: UserId,
    /// Contact email; empty when the identity has none.
    #[serde(default)]
    pub email: String,
    /// Display name; empty when unknown.
    #[serde(default)]
    pub full_name: String,
    /// Platform role.
    pub role: Role,
    /// Optional phone number, edited through profile settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Profile {
    /// Build a profile from identity metadata for a user who has no row yet.
    ///
    /// Missing fields become empty strings; a missing or unrecognized role
    /// hint defaults to [`Role::Student`].
    #[must_use]
    pub fn synthesize(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone().unwrap_or_default(),
            full_name: identity.metadata.full_name.clone().unwrap_or_default(),
            role: identity.role_hint().unwrap_or_default(),
            phone: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserMetadata;

    #[test]
    fn test_synthesize_copies_metadata_hints() {
        let identity = Identity {
            id: UserId::new("u1"),
            email: None,
            metadata: UserMetadata {
                full_name: Some("Ann".to_owned()),
                role: Some("mentor".to_owned()),
                ..UserMetadata::default()
            },
        };

        let profile = Profile::synthesize(&identity);
        assert_eq!(
            profile,
            Profile {
                id: UserId::new("u1"),
                email: String::new(),
                full_name: "Ann".to_owned(),
                role: Role::Mentor,
                phone: None,
            }
        );
    }

    #[test]
    fn test_synthesize_defaults_role_to_student() {
        let identity = Identity::new("u2", Some("bo@school.edu".to_owned()));
        let profile = Profile::synthesize(&identity);
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.email, "bo@school.edu");
        assert_eq!(profile.full_name, "");
    }

    #[test]
    fn test_synthesize_ignores_unknown_role_hint() {
        let mut identity = Identity::new("u3", None);
        identity.metadata.role = Some("owner".to_owned());
        assert_eq!(Profile::synthesize(&identity).role, Role::Student);
    }
}
