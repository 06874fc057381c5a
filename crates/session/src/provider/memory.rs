//! Scriptable in-memory auth provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use tutorhub_core::{Email, Identity, Session};

use super::ProviderError;
use crate::ports::{AuthEvent, AuthProvider, AuthSubscription};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
    confirmed: bool,
}

/// Auth provider that keeps accounts and the current session in memory.
///
/// Behaves like the hosted service (events on sign-in/out, typed
/// credential errors) and can be told to fail or hang.
#[derive(Debug)]
pub struct InMemoryAuthProvider {
    accounts: Mutex<HashMap<Email, Account>>,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    unreachable: AtomicBool,
    hanging: AtomicBool,
    session_fetches: AtomicUsize,
    next_token: AtomicU64,
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthProvider {
    /// Create a provider with no accounts and no session.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events,
            unreachable: AtomicBool::new(false),
            hanging: AtomicBool::new(false),
            session_fetches: AtomicUsize::new(0),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register a confirmed account.
    pub fn register(&self, email: Email, password: &str, identity: Identity) {
        self.insert_account(email, password, identity, true);
    }

    /// Register an account whose email was never confirmed.
    pub fn register_unconfirmed(&self, email: Email, password: &str, identity: Identity) {
        self.insert_account(email, password, identity, false);
    }

    fn insert_account(&self, email: Email, password: &str, identity: Identity, confirmed: bool) {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email,
                Account {
                    password: password.to_owned(),
                    identity,
                    confirmed,
                },
            );
    }

    /// Replace the current session without emitting an event.
    pub fn set_session(&self, session: Option<Session>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Make every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make `get_session` never complete.
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    /// Number of `get_session` calls so far.
    #[must_use]
    pub fn session_fetches(&self) -> usize {
        self.session_fetches.load(Ordering::SeqCst)
    }

    /// Broadcast an event to subscribers. Returns how many received it.
    pub fn emit(&self, event: AuthEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    fn check_reachable(&self) -> Result<(), ProviderError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("network unreachable".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.session_fetches.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check_reachable()?;

        Ok(self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, ProviderError> {
        self.check_reachable()?;

        let account = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .cloned()
            .filter(|account| account.password == password)
            .ok_or_else(|| ProviderError::InvalidCredentials("Invalid login credentials".to_owned()))?;

        if !account.confirmed {
            return Err(ProviderError::EmailNotConfirmed);
        }

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let session = Session::new(format!("memory-token-{token}"), account.identity);
        self.set_session(Some(session.clone()));
        self.emit(AuthEvent::signed_in(session.clone()));

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.check_reachable()?;
        self.set_session(None);
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::AuthEventKind;

    fn email() -> Email {
        Email::parse("ann@school.edu").unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_emits_event_and_sets_session() {
        let provider = InMemoryAuthProvider::new();
        provider.register(email(), "pw", Identity::new("u1", Some("ann@school.edu".to_owned())));
        let mut events = provider.subscribe();

        let session = provider.sign_in_with_password(&email(), "pw").await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, AuthEventKind::SignedIn);
        assert_eq!(event.session, Some(session.clone()));
        assert_eq!(provider.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let provider = InMemoryAuthProvider::new();
        provider.register(email(), "pw", Identity::new("u1", None));

        let result = provider.sign_in_with_password(&email(), "nope").await;
        assert!(matches!(result, Err(ProviderError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_unconfirmed_email() {
        let provider = InMemoryAuthProvider::new();
        provider.register_unconfirmed(email(), "pw", Identity::new("u1", None));

        let result = provider.sign_in_with_password(&email(), "pw").await;
        assert!(matches!(result, Err(ProviderError::EmailNotConfirmed)));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let provider = InMemoryAuthProvider::new();
        provider.set_unreachable(true);
        assert!(matches!(
            provider.get_session().await,
            Err(ProviderError::Unavailable(_))
        ));
        assert_eq!(provider.session_fetches(), 1);
    }
}
