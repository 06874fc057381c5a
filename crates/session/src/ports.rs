//! Port interfaces for the session layer.
//!
//! These traits define the boundaries between the session services and
//! the external collaborators: the hosted auth service, the profile table,
//! browser-style key-value storage and the router.

use async_trait::async_trait;
use tokio::sync::broadcast;

use tutorhub_core::{Email, Profile, Session, UserId};

use crate::db::RepositoryError;
use crate::provider::ProviderError;
use crate::storage::StorageError;

// =============================================================================
// Auth provider
// =============================================================================

/// Kind of auth state change reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// Where an auth event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventOrigin {
    /// Triggered from inside the running app (password sign-in, refresh).
    #[default]
    Internal,
    /// Triggered by returning from an external flow such as a magic link.
    ExternalCallback,
}

/// An auth state change.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// The session after the change; `None` for sign-out.
    pub session: Option<Session>,
    pub origin: EventOrigin,
}

impl AuthEvent {
    /// A sign-in from inside the app.
    #[must_use]
    pub const fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
            origin: EventOrigin::Internal,
        }
    }

    /// A sign-in completed by an external callback.
    #[must_use]
    pub const fn signed_in_from_callback(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
            origin: EventOrigin::ExternalCallback,
        }
    }

    /// A token refresh.
    #[must_use]
    pub const fn token_refreshed(session: Session) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            session: Some(session),
            origin: EventOrigin::Internal,
        }
    }

    /// A sign-out.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
            origin: EventOrigin::Internal,
        }
    }

    /// Whether handling this event changes session state.
    ///
    /// Sign-in and refresh events only carry meaning with a session attached.
    #[must_use]
    pub const fn is_applicable(&self) -> bool {
        matches!(self.kind, AuthEventKind::SignedOut) || self.session.is_some()
    }
}

/// Live subscription to a provider's auth events.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Wrap the receiving half of a provider's event channel.
    #[must_use]
    pub const fn new(receiver: broadcast::Receiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. Returns `None` once the provider is gone.
    ///
    /// If the subscriber fell behind, the missed events are skipped and the
    /// next available one is returned.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// External authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Fetch the current authoritative session, if any.
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Sign in with email and password.
    ///
    /// On success the provider also emits a `SignedIn` event.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// End the current session. The provider emits a `SignedOut` event.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to auth state changes.
    fn subscribe(&self) -> AuthSubscription;
}

// =============================================================================
// Profile store
// =============================================================================

/// Persistence for application profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up a profile by user id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Insert a new profile and return the stored row.
    async fn insert(&self, profile: &Profile) -> Result<Profile, RepositoryError>;
}

// =============================================================================
// Key-value storage
// =============================================================================

/// String key-value storage, in the manner of browser local/session storage.
///
/// Absence of a key is always a valid state.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// Navigator
// =============================================================================

/// In-app router.
pub trait Navigator: Send + Sync {
    /// Current location path.
    fn current_location(&self) -> String;

    /// Client-side navigation.
    fn navigate(&self, path: &str);

    /// Hard navigation replacing the current location.
    fn replace_location(&self, path: &str);
}
