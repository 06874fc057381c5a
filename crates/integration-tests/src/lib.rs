//! Integration tests for the TutorHub session layer.
//!
//! Every test wires the real services to the in-memory adapters, so no auth
//! service or database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tutorhub-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_flow` - Bootstrap, reconciliation, redirects and sign-out
//! - `landing_routes` - Role to landing route resolution
//! - `sign_in` - Login form outcomes

use std::sync::Arc;

use tutorhub_core::{Identity, Profile, Role, Session, UserId};
use tutorhub_session::config::BootstrapOptions;
use tutorhub_session::db::InMemoryProfileStore;
use tutorhub_session::navigation::RecordingNavigator;
use tutorhub_session::provider::InMemoryAuthProvider;
use tutorhub_session::services::auth::AuthService;
use tutorhub_session::services::bootstrap::SessionBootstrapper;
use tutorhub_session::state::AppState;
use tutorhub_session::storage::MemoryStore;

/// In-memory collaborators for one simulated browser tab.
pub struct TestContext {
    pub provider: Arc<InMemoryAuthProvider>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub local: Arc<MemoryStore>,
    pub session: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub options: BootstrapOptions,
}

impl TestContext {
    /// A tab sitting at `location` with empty storage and no profiles.
    #[must_use]
    pub fn at(location: &str) -> Self {
        Self {
            provider: Arc::new(InMemoryAuthProvider::new()),
            profiles: Arc::new(InMemoryProfileStore::new()),
            local: Arc::new(MemoryStore::new()),
            session: Arc::new(MemoryStore::new()),
            navigator: Arc::new(RecordingNavigator::at(location)),
            options: BootstrapOptions::default(),
        }
    }

    /// Replace the profile store.
    #[must_use]
    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = Profile>) -> Self {
        self.profiles = Arc::new(InMemoryProfileStore::with_profiles(profiles));
        self
    }

    /// Dependency container over these collaborators.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        AppState::builder(
            self.provider.clone(),
            self.profiles.clone(),
            self.navigator.clone(),
        )
        .local_store(self.local.clone())
        .session_store(self.session.clone())
        .options(self.options)
        .build()
    }

    /// Start a bootstrapper for this tab.
    #[must_use]
    pub fn start(&self) -> SessionBootstrapper {
        SessionBootstrapper::start(self.app_state())
    }

    /// Sign-in service for this tab.
    #[must_use]
    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.app_state())
    }
}

/// An identity with optional sign-up metadata and no email.
#[must_use]
pub fn identity(id: &str, full_name: Option<&str>, role: Option<&str>) -> Identity {
    let mut identity = Identity::new(id, None);
    identity.metadata.full_name = full_name.map(str::to_owned);
    identity.metadata.role = role.map(str::to_owned);
    identity
}

/// A session for `identity`.
#[must_use]
pub fn session_for(identity: Identity) -> Session {
    Session::new(format!("access-{}", identity.id), identity)
}

/// A stored profile row.
#[must_use]
pub fn profile(id: &str, role: Role) -> Profile {
    Profile {
        id: UserId::new(id),
        email: format!("{id}@school.edu"),
        full_name: format!("User {id}"),
        role,
        phone: None,
    }
}
