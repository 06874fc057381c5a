//! Auth provider adapters.
//!
//! - [`HostedAuthClient`] - REST client for the hosted auth service
//! - [`InMemoryAuthProvider`] - Scriptable provider for tests and offline use

mod hosted;
mod memory;

pub use hosted::HostedAuthClient;
pub use memory::InMemoryAuthProvider;

use thiserror::Error;

/// Errors that can occur when talking to the auth provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured service URL could not be extended to an endpoint.
    #[error("invalid auth service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Email/password rejected.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The account exists but its email address was never confirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// The service answered with an unexpected error.
    #[error("auth service error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// An external sign-in callback URL was missing data or reported an error.
    #[error("invalid sign-in callback: {0}")]
    InvalidCallback(String),

    /// The provider could not be reached.
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}
