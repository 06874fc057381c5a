//! Command implementations.

pub mod migrate;
pub mod route;
pub mod session;
