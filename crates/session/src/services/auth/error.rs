//! Authentication error types.

use thiserror::Error;

use crate::provider::ProviderError;

/// Shown when the auth service refuses the email/password pair.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Shown when the account exists but its email was never confirmed.
pub const EMAIL_NOT_CONFIRMED_MESSAGE: &str =
    "Please reset your password to verify your email address";

/// Shown when the auth service could not be reached.
pub const UNAVAILABLE_MESSAGE: &str = "Could not reach the sign-in service. Please try again.";

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tutorhub_core::EmailError),

    /// Password field left empty.
    #[error("password is required")]
    MissingPassword,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account's email address is unconfirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// Any other provider failure.
    #[error("auth provider error: {0}")]
    Provider(ProviderError),
}

impl AuthError {
    /// Message suitable for a login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_owned(),
            Self::MissingPassword => "Please enter your password".to_owned(),
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_owned(),
            Self::EmailNotConfirmed => EMAIL_NOT_CONFIRMED_MESSAGE.to_owned(),
            Self::Provider(_) => UNAVAILABLE_MESSAGE.to_owned(),
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::InvalidCredentials(_) => Self::InvalidCredentials,
            ProviderError::EmailNotConfirmed => Self::EmailNotConfirmed,
            other => Self::Provider(other),
        }
    }
}
