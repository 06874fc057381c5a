//! Identity and session records owned by the hosted auth service.
//!
//! These are mirrored read-only; the application never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// Free-form metadata attached to an identity at sign-up.
///
/// Only `full_name` and `role` are interpreted; everything else is carried
/// through untouched so cached identities round-trip losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Display name captured at sign-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Role hint captured at sign-up. Not trusted for authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Any other keys the auth service returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An authenticated user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Auth service user id, shared with the profile row.
    pub id: UserId,
    /// Email address, when the account has one.
    #[serde(default)]
    pub email: Option<String>,
    /// Sign-up metadata.
    #[serde(default, rename = "user_metadata")]
    pub metadata: UserMetadata,
}

impl Identity {
    /// Create an identity with empty metadata.
    #[must_use]
    pub fn new(id: impl Into<UserId>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            metadata: UserMetadata::default(),
        }
    }

    /// The metadata role hint, if it names a valid role.
    #[must_use]
    pub fn role_hint(&self) -> Option<Role> {
        Role::from_hint(self.metadata.role.as_deref())
    }
}

/// An authenticated session.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone, PartialEq)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    pub refresh_token: Option<String>,
    /// When the access token stops being accepted.
    pub expires_at: Option<DateTime<Utc>>,
    /// The signed-in identity.
    pub user: Identity,
}

impl Session {
    /// Create a session that never expires locally.
    #[must_use]
    pub fn new(access_token: impl Into<String>, user: Identity) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            user,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}
