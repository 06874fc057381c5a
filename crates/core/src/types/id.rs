//! User identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier issued by the hosted auth service.
///
/// The identity and the profile row of one user share this value, which is
/// how a cached profile is matched to the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_raw_value() {
        assert_eq!(UserId::new("6f1c2a").to_string(), "6f1c2a");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = UserId::from("u1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"u1\""));
        let back: Result<UserId, _> = serde_json::from_str("\"u1\"");
        assert_eq!(back.ok(), Some(id));
    }
}
