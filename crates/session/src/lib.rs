//! TutorHub session library.
//!
//! Mirrors the hosted auth service's session into an application state
//! container, resolves each role's landing route and keeps auth-driven
//! redirects from overlapping.
//!
//! # Architecture
//!
//! - [`ports`] - Traits for the auth provider, profile store, key-value
//!   storage and navigator
//! - [`provider`], [`db`], [`storage`], [`navigation`] - Adapters for those ports
//! - [`services`] - Bootstrapper, reconciliation, role resolver, redirect guard
//!   and sign-in service
//! - [`state`] - The dependency container handed to the services
//! - [`models`] - The published session state
//!
//! # Example
//!
//! ```rust,ignore
//! use tutorhub_session::services::bootstrap::SessionBootstrapper;
//!
//! let bootstrapper = SessionBootstrapper::start(state.clone());
//! let settled = bootstrapper.wait_until_settled().await;
//! println!("signed in as {:?}", settled.role());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod navigation;
pub mod ports;
pub mod provider;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;
