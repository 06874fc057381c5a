//! Session services.
//!
//! - [`bootstrap`] - Restores, reconciles and follows the auth session
//! - [`reconcile`] - Derives a profile from an identity
//! - [`resolver`] - Maps roles to landing routes
//! - [`guard`] - Single-flight redirect guard
//! - [`auth`] - Password sign-in and sign-out for login forms

pub mod auth;
pub mod bootstrap;
pub mod guard;
pub mod reconcile;
pub mod resolver;
