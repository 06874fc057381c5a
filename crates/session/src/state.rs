//! Application state shared across the session services.

use std::sync::Arc;

use crate::config::BootstrapOptions;
use crate::ports::{AuthProvider, KeyValueStore, Navigator, ProfileStore};
use crate::storage::MemoryStore;

/// Dependencies shared by the session services.
///
/// This struct is cheaply cloneable via `Arc` and replaces module-level
/// globals: everything the services touch is injected here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    local_store: Arc<dyn KeyValueStore>,
    session_store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    options: BootstrapOptions,
}

impl AppState {
    /// Start building application state from its three required collaborators.
    #[must_use]
    pub fn builder(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        navigator: Arc<dyn Navigator>,
    ) -> AppStateBuilder {
        AppStateBuilder {
            provider,
            profiles,
            navigator,
            local_store: None,
            session_store: None,
            options: BootstrapOptions::default(),
        }
    }

    /// Get the auth provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn AuthProvider> {
        &self.inner.provider
    }

    /// Get the profile store.
    #[must_use]
    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.inner.profiles
    }

    /// Get the persistent local store.
    #[must_use]
    pub fn local_store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.local_store
    }

    /// Get the session-scoped store.
    #[must_use]
    pub fn session_store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.session_store
    }

    /// Get the navigator.
    #[must_use]
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    /// Get the timing options.
    #[must_use]
    pub fn options(&self) -> BootstrapOptions {
        self.inner.options
    }
}

/// Builder for [`AppState`].
///
/// Storage defaults to fresh in-memory stores; options default to
/// [`BootstrapOptions::default`].
pub struct AppStateBuilder {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    navigator: Arc<dyn Navigator>,
    local_store: Option<Arc<dyn KeyValueStore>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    options: BootstrapOptions,
}

impl AppStateBuilder {
    /// Use `store` as persistent local storage.
    #[must_use]
    pub fn local_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Use `store` as session-scoped storage.
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Override timing options.
    #[must_use]
    pub const fn options(mut self, options: BootstrapOptions) -> Self {
        self.options = options;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> AppState {
        AppState {
            inner: Arc::new(AppStateInner {
                provider: self.provider,
                profiles: self.profiles,
                local_store: self
                    .local_store
                    .unwrap_or_else(|| Arc::new(MemoryStore::new())),
                session_store: self
                    .session_store
                    .unwrap_or_else(|| Arc::new(MemoryStore::new())),
                navigator: self.navigator,
                options: self.options,
            }),
        }
    }
}
