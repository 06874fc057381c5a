//! Domain models published by the session layer.

pub mod session;

pub use session::{SessionState, StateSource};
