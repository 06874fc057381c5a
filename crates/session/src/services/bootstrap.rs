//! Session bootstrapper.
//!
//! On start the bootstrapper:
//!
//! 1. Publishes the cached identity/profile from local storage so the UI
//!    can paint before the network answers.
//! 2. Subscribes to the provider's auth events.
//! 3. Fetches the authoritative session (bounded by the configured timeout)
//!    and reconciles the profile for it.
//!
//! One background task owns the subscription and handles the initial fetch
//! and every later event in order. An event that arrives before the initial
//! fetch finishes supersedes it.
//!
//! Authoritative state always overwrites cached state, never the reverse.
//! Nothing here returns an error to the caller: provider and store failures
//! are logged and the last good state stays published.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use tutorhub_core::{Identity, Profile, ROOT_PATH, Role, Session};

use super::guard::RedirectGuard;
use super::reconcile::reconcile_profile;
use super::resolver::RoleResolver;
use crate::models::{SessionState, StateSource};
use crate::ports::{AuthEvent, AuthEventKind, AuthSubscription, EventOrigin};
use crate::provider::ProviderError;
use crate::state::AppState;
use crate::storage::{keys, read_json, remove_logged, write_json};
use crate::telemetry;

/// Why the initial session fetch produced no session.
#[derive(Debug, Error)]
enum InitialFetchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("session fetch timed out after {0:?}")]
    TimedOut(Duration),
}

/// Running session bootstrapper.
///
/// Dropping it (or calling [`shutdown`](Self::shutdown)) unsubscribes from
/// auth events and stops the background task.
pub struct SessionBootstrapper {
    core: Arc<BootstrapCore>,
    state: watch::Receiver<SessionState>,
    listener: JoinHandle<()>,
}

struct BootstrapCore {
    app: AppState,
    publisher: watch::Sender<SessionState>,
    /// Count of auth events fully handled, redirects included.
    handled: watch::Sender<u64>,
    guard: RedirectGuard,
    resolver: RoleResolver,
}

impl SessionBootstrapper {
    /// Restore cached state, subscribe to auth events and start reconciling.
    ///
    /// The cached snapshot is published before this returns. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn start(app: AppState) -> Self {
        let (publisher, state) = watch::channel(SessionState::restoring());
        let options = app.options();
        let core = Arc::new(BootstrapCore {
            guard: RedirectGuard::new(app.session_store().clone(), options.redirect_timeout),
            resolver: RoleResolver::new(app.local_store().clone()),
            publisher,
            handled: watch::Sender::new(0),
            app,
        });

        core.restore_from_cache();

        let subscription = core.app.provider().subscribe();
        let listener = tokio::spawn(Arc::clone(&core).run(subscription));

        Self {
            core,
            state,
            listener,
        }
    }

    /// Receiver for the published state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Snapshot of the published state.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Wait until the initial authoritative fetch has finished, failed or
    /// timed out, and return the state at that point.
    pub async fn wait_until_settled(&self) -> SessionState {
        let mut state = self.state.clone();
        match state.wait_for(|s| !s.loading).await {
            Ok(settled) => settled.clone(),
            Err(_) => self.current(),
        }
    }

    /// Number of auth events handled so far.
    #[must_use]
    pub fn handled_events(&self) -> u64 {
        *self.core.handled.borrow()
    }

    /// Wait until at least `count` auth events have been handled, including
    /// any redirect they trigger.
    pub async fn wait_for_events(&self, count: u64) {
        let mut handled = self.core.handled.subscribe();
        // The sender lives in `core`, so the channel cannot close here.
        let _ = handled.wait_for(|n| *n >= count).await;
    }

    /// The redirect guard used for auth-driven navigation.
    #[must_use]
    pub fn redirect_guard(&self) -> &RedirectGuard {
        &self.core.guard
    }

    /// The role resolver bound to this app's local storage.
    #[must_use]
    pub fn resolver(&self) -> &RoleResolver {
        &self.core.resolver
    }

    /// Unsubscribe and stop the background task.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for SessionBootstrapper {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn fetch_initial_session(app: AppState) -> Result<Option<Session>, InitialFetchError> {
    let fetch = async { app.provider().get_session().await.map_err(InitialFetchError::from) };
    match app.options().session_timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .map_err(|_| InitialFetchError::TimedOut(limit))?,
        None => fetch.await,
    }
}

impl BootstrapCore {
    async fn run(self: Arc<Self>, mut subscription: AuthSubscription) {
        let initial = fetch_initial_session(self.app.clone());
        tokio::pin!(initial);
        let mut initial_pending = true;

        loop {
            tokio::select! {
                result = &mut initial, if initial_pending => {
                    initial_pending = false;
                    self.apply_initial(result).await;
                }
                event = subscription.recv() => {
                    let Some(event) = event else {
                        if initial_pending {
                            self.apply_initial((&mut initial).await).await;
                        }
                        tracing::debug!("Auth event stream closed");
                        break;
                    };
                    if initial_pending && event.is_applicable() {
                        initial_pending = false;
                        tracing::debug!(kind = ?event.kind, "Auth event superseded initial session fetch");
                    }
                    self.handle_event(event).await;
                    self.handled.send_modify(|n| *n += 1);
                }
            }
        }
    }

    /// Publish the cached snapshot unless authoritative state already exists.
    fn restore_from_cache(&self) {
        let local = self.app.local_store().as_ref();
        let identity = read_json::<Identity>(local, keys::CACHED_USER);
        let profile = read_json::<Profile>(local, keys::CACHED_PROFILE)
            .filter(|profile| identity.as_ref().is_none_or(|i| i.id == profile.id));

        if identity.is_none() && profile.is_none() {
            return;
        }

        let restored = self.publisher.send_if_modified(|state| {
            if state.source == StateSource::Authoritative {
                return false;
            }
            state.identity = identity;
            state.profile = profile;
            state.source = StateSource::Cache;
            true
        });

        if restored {
            tracing::debug!("Published cached session snapshot");
        }
    }

    async fn apply_initial(&self, result: Result<Option<Session>, InitialFetchError>) {
        match result {
            Ok(Some(session)) => self.apply_session(session).await,
            Ok(None) => {
                tracing::debug!("No active session");
                for key in [keys::CACHED_USER, keys::CACHED_PROFILE, keys::CONFIRMED_ROLE] {
                    remove_logged(self.app.local_store().as_ref(), key);
                }
                self.publisher.send_replace(SessionState {
                    source: StateSource::Authoritative,
                    ..SessionState::default()
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load session, keeping cached state");
                self.publisher.send_modify(|state| state.loading = false);
            }
        }
    }

    async fn handle_event(&self, event: AuthEvent) {
        tracing::debug!(kind = ?event.kind, origin = ?event.origin, "Auth state changed");

        match (event.kind, event.session) {
            (AuthEventKind::SignedIn, Some(session)) => {
                self.apply_session(session).await;
                self.redirect_after_sign_in(event.origin);
            }
            (AuthEventKind::TokenRefreshed, Some(session)) => {
                self.apply_session(session).await;
            }
            (AuthEventKind::SignedOut, _) => self.apply_sign_out(),
            (kind, None) => {
                tracing::warn!(?kind, "Auth event without a session, ignoring");
            }
        }
    }

    /// Publish the authoritative identity, then its reconciled profile.
    async fn apply_session(&self, session: Session) {
        let identity = session.user;
        let local = self.app.local_store().as_ref();

        self.publisher.send_modify(|state| {
            let same_user = state.identity.as_ref().is_some_and(|i| i.id == identity.id)
                || state.profile.as_ref().is_some_and(|p| p.id == identity.id);
            if !same_user {
                state.profile = None;
            }
            state.identity = Some(identity.clone());
            state.source = StateSource::Authoritative;
        });
        write_json(local, keys::CACHED_USER, &identity);
        telemetry::identify(&identity);

        let profile = reconcile_profile(self.app.profiles().as_ref(), &identity).await;

        self.publisher.send_modify(|state| {
            if state.identity.as_ref().is_some_and(|i| i.id == identity.id) {
                // A failed lookup keeps this user's earlier profile.
                if let Some(profile) = profile.clone() {
                    state.profile = Some(profile);
                }
            }
            state.loading = false;
        });

        if let Some(profile) = profile {
            write_json(local, keys::CACHED_PROFILE, &profile);
            if let Err(e) = local.set(keys::CONFIRMED_ROLE, profile.role.as_str()) {
                tracing::warn!(error = %e, "Failed to record confirmed role");
            }
        }
    }

    fn redirect_after_sign_in(&self, origin: EventOrigin) {
        let Some(permit) = self.guard.try_acquire() else {
            tracing::debug!("Redirect already in flight, skipping");
            return;
        };

        let role = self.publisher.borrow().role();
        let landing = self.resolver.landing_route(role);
        let navigator = self.app.navigator();
        let current = navigator.current_location();

        let already_there = current == landing
            || Role::section_of(&current).is_some_and(|section| section.dashboard_root() == landing);
        if already_there {
            tracing::debug!(%current, landing, "Already in landing section, not redirecting");
            permit.release();
            return;
        }

        match origin {
            EventOrigin::ExternalCallback => navigator.replace_location(landing),
            EventOrigin::Internal => navigator.navigate(landing),
        }
        tracing::info!(from = %current, to = landing, ?origin, "Redirected after sign-in");
        telemetry::redirect_breadcrumb(&current, landing);

        permit.release_after(self.app.options().redirect_settle);
    }

    fn apply_sign_out(&self) {
        self.guard.clear();

        let local = self.app.local_store().as_ref();
        for key in keys::SIGN_OUT_CLEARS {
            remove_logged(local, key);
        }
        telemetry::forget_user();

        self.publisher.send_replace(SessionState {
            source: StateSource::Authoritative,
            ..SessionState::default()
        });

        let navigator = self.app.navigator();
        let current = navigator.current_location();
        if Role::section_of(&current).is_some() {
            tracing::info!(from = %current, "Signed out inside a dashboard, returning to root");
            navigator.navigate(ROOT_PATH);
        } else {
            tracing::info!("Signed out");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::BootstrapOptions;
    use crate::db::InMemoryProfileStore;
    use crate::navigation::RecordingNavigator;
    use crate::ports::KeyValueStore;
    use crate::provider::InMemoryAuthProvider;
    use crate::storage::MemoryStore;
    use tutorhub_core::UserId;

    struct Harness {
        provider: Arc<InMemoryAuthProvider>,
        profiles: Arc<InMemoryProfileStore>,
        local: Arc<MemoryStore>,
        navigator: Arc<RecordingNavigator>,
    }

    impl Harness {
        fn new(location: &str) -> Self {
            Self {
                provider: Arc::new(InMemoryAuthProvider::new()),
                profiles: Arc::new(InMemoryProfileStore::new()),
                local: Arc::new(MemoryStore::new()),
                navigator: Arc::new(RecordingNavigator::at(location)),
            }
        }

        fn app(&self) -> AppState {
            AppState::builder(
                self.provider.clone(),
                self.profiles.clone(),
                self.navigator.clone(),
            )
            .local_store(self.local.clone())
            .options(BootstrapOptions::default())
            .build()
        }
    }

    fn session(id: &str, role: Option<&str>) -> Session {
        let mut identity = Identity::new(id, Some(format!("{id}@school.edu")));
        identity.metadata.role = role.map(str::to_owned);
        Session::new(format!("token-{id}"), identity)
    }

    #[tokio::test]
    async fn test_no_session_settles_signed_out() {
        let harness = Harness::new("/");
        let bootstrapper = SessionBootstrapper::start(harness.app());

        let settled = bootstrapper.wait_until_settled().await;
        assert!(!settled.is_signed_in());
        assert_eq!(settled.source, StateSource::Authoritative);
    }

    #[tokio::test]
    async fn test_existing_session_is_reconciled_and_cached() {
        let harness = Harness::new("/");
        harness.provider.set_session(Some(session("u7", Some("admin"))));

        let bootstrapper = SessionBootstrapper::start(harness.app());
        let settled = bootstrapper.wait_until_settled().await;

        assert_eq!(settled.role(), Some(Role::Admin));
        assert!(harness.profiles.get(&UserId::new("u7")).is_some());
        assert!(harness.local.contains(keys::CACHED_USER));
        assert!(harness.local.contains(keys::CACHED_PROFILE));
        assert_eq!(
            harness.local.get(keys::CONFIRMED_ROLE).unwrap().as_deref(),
            Some("admin")
        );
        // Restoring an existing session never navigates.
        assert!(harness.navigator.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_cache_is_published_before_fetch_completes() {
        let harness = Harness::new("/");
        let cached = Identity::new("u1", None);
        write_json(harness.local.as_ref(), keys::CACHED_USER, &cached);
        harness.provider.set_hanging(true);

        let bootstrapper = SessionBootstrapper::start(harness.app());
        let state = bootstrapper.current();

        assert_eq!(state.source, StateSource::Cache);
        assert_eq!(state.identity, Some(cached));
        assert!(state.loading);
    }

    #[tokio::test]
    async fn test_cached_profile_for_other_user_is_ignored() {
        let harness = Harness::new("/");
        write_json(harness.local.as_ref(), keys::CACHED_USER, &Identity::new("u1", None));
        write_json(
            harness.local.as_ref(),
            keys::CACHED_PROFILE,
            &Profile::synthesize(&Identity::new("u2", None)),
        );
        harness.provider.set_hanging(true);

        let bootstrapper = SessionBootstrapper::start(harness.app());
        assert!(bootstrapper.current().profile.is_none());
    }

    #[tokio::test]
    async fn test_token_refresh_does_not_redirect() {
        let harness = Harness::new("/login");
        let bootstrapper = SessionBootstrapper::start(harness.app());
        bootstrapper.wait_until_settled().await;

        let mut state = bootstrapper.state();
        harness
            .provider
            .emit(AuthEvent::token_refreshed(session("u3", Some("mentor"))));
        state.wait_for(|s| s.profile.is_some()).await.unwrap();

        assert!(harness.navigator.navigations().is_empty());
    }

    fn sessionless(kind: AuthEventKind) -> AuthEvent {
        AuthEvent {
            kind,
            session: None,
            origin: EventOrigin::Internal,
        }
    }

    #[tokio::test]
    async fn test_sessionless_event_keeps_initial_fetch() {
        let harness = Harness::new("/");
        harness.provider.set_session(Some(session("u1", Some("student"))));

        let bootstrapper = SessionBootstrapper::start(harness.app());
        harness.provider.emit(sessionless(AuthEventKind::TokenRefreshed));
        harness.provider.emit(sessionless(AuthEventKind::SignedIn));

        let settled = bootstrapper.wait_until_settled().await;
        assert_eq!(settled.source, StateSource::Authoritative);
        assert_eq!(settled.role(), Some(Role::Student));

        bootstrapper.wait_for_events(2).await;
        assert!(harness.navigator.navigations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessionless_event_during_hung_fetch_still_times_out() {
        let harness = Harness::new("/");
        let cached = Identity::new("u1", None);
        write_json(harness.local.as_ref(), keys::CACHED_USER, &cached);
        harness.provider.set_hanging(true);

        let bootstrapper = SessionBootstrapper::start(harness.app());
        harness.provider.emit(sessionless(AuthEventKind::TokenRefreshed));
        bootstrapper.wait_for_events(1).await;
        assert!(bootstrapper.current().loading);

        let settled = bootstrapper.wait_until_settled().await;
        assert!(!settled.loading);
        assert_eq!(settled.source, StateSource::Cache);
        assert_eq!(settled.identity, Some(cached));
    }
}
