//! TutorHub Core - Shared domain types.
//!
//! This crate provides the types used across all TutorHub components:
//! - `session` - Session bootstrap, role resolution and redirect guarding
//! - `cli` - Command-line tools for sign-in, role overrides and migrations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - User IDs, emails, roles, identities, sessions and profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
