//! Authentication service.
//!
//! Password sign-in and sign-out for login forms. The service only talks to
//! the auth provider; the provider's events drive reconciliation, redirects
//! and cleanup through the bootstrapper.

mod error;

pub use error::{
    AuthError, EMAIL_NOT_CONFIRMED_MESSAGE, INVALID_CREDENTIALS_MESSAGE, UNAVAILABLE_MESSAGE,
};

use tutorhub_core::{Email, Session, UserId};

use crate::state::AppState;

/// Result of a sign-in attempt, shaped for a login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The provider accepted the credentials.
    Success { user_id: UserId },
    /// The attempt failed; `message` is safe to show.
    Rejected { message: String },
    /// The account exists but must re-verify its email.
    EmailNotConfirmed { message: String },
}

impl SignInOutcome {
    /// Whether the user is now signed in.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Message to display, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Rejected { message } | Self::EmailNotConfirmed { message } => Some(message),
        }
    }
}

impl From<AuthError> for SignInOutcome {
    fn from(e: AuthError) -> Self {
        let message = e.user_message();
        match e {
            AuthError::EmailNotConfirmed => Self::EmailNotConfirmed { message },
            _ => Self::Rejected { message },
        }
    }
}

/// Authentication service.
pub struct AuthService {
    state: AppState,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// Never fails outright: every failure becomes a displayable
    /// [`SignInOutcome`]. A malformed email is rejected without contacting
    /// the provider. An unconfirmed email is a hard failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> SignInOutcome {
        match self.login_with_password(email, password).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Signed in with password");
                SignInOutcome::Success {
                    user_id: session.user.id,
                }
            }
            Err(e) => {
                match &e {
                    AuthError::Provider(inner) => {
                        tracing::error!(error = %inner, "Sign-in failed: auth provider error");
                    }
                    other => tracing::info!(reason = %other, "Sign-in rejected"),
                }
                e.into()
            }
        }
    }

    /// Sign in with email and password, returning the new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::MissingPassword` if the password is empty.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotConfirmed` if the account is unverified.
    /// Returns `AuthError::Provider` for any other provider failure.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }

        let session = self
            .state
            .provider()
            .sign_in_with_password(&email, password)
            .await?;

        Ok(session)
    }

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the provider could not sign out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.provider().sign_out().await.map_err(|e| {
            tracing::warn!(error = %e, "Sign-out failed");
            AuthError::from(e)
        })?;
        tracing::info!("Signed out");
        Ok(())
    }
}
