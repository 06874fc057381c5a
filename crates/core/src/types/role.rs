//! User roles and their dashboard sections.

use serde::{Deserialize, Serialize};

/// Path every unrecognized or missing role lands on.
pub const ROOT_PATH: &str = "/";

/// Error returned when a string is not one of the three role names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0:?} (expected student, mentor or admin)")]
pub struct ParseRoleError(pub String);

/// Platform role. Determines the landing route and which dashboard section
/// a user may enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Student,
    Mentor,
    Admin,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Self; 3] = [Self::Student, Self::Mentor, Self::Admin];

    /// Lowercase role name as stored by the auth service and profile table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Mentor => "mentor",
            Self::Admin => "admin",
        }
    }

    /// Root of this role's dashboard section, which is also its landing route.
    #[must_use]
    pub const fn dashboard_root(self) -> &'static str {
        match self {
            Self::Student => "/student-dashboard",
            Self::Mentor => "/mentor-dashboard",
            Self::Admin => "/admin-dashboard",
        }
    }

    /// Whether `path` is this role's dashboard root or a sub-path of it.
    #[must_use]
    pub fn owns_path(self, path: &str) -> bool {
        let root = self.dashboard_root();
        path.strip_prefix(root)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// The role whose dashboard section contains `path`, if any.
    #[must_use]
    pub fn section_of(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.owns_path(path))
    }

    /// Parse an optional role hint, ignoring anything unrecognized.
    #[must_use]
    pub fn from_hint(hint: Option<&str>) -> Option<Self> {
        hint.and_then(|value| value.parse().ok())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(Self::Student),
            "mentor" => Ok(Self::Mentor),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}
