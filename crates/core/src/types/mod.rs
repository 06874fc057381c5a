//! Core types for TutorHub.
//!
//! This module provides type-safe wrappers for the identity and profile
//! records mirrored from the hosted auth service.

pub mod email;
pub mod id;
pub mod identity;
pub mod profile;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, Session, UserMetadata};
pub use profile::Profile;
pub use role::{ParseRoleError, ROOT_PATH, Role};
