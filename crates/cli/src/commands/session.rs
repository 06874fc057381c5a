//! Session commands against the hosted auth service.
//!
//! Each command wires the real adapters together, starts the session
//! bootstrapper, lets it settle, then performs its action and waits for the
//! resulting auth event to be handled (profile reconciled, redirect issued).
//!
//! # Environment Variables
//!
//! - `TUTORHUB_AUTH_URL` / `TUTORHUB_ANON_KEY` - Hosted auth service
//! - `TUTORHUB_DATABASE_URL` - Profile database
//! - `TUTORHUB_STORAGE_PATH` - Local storage file

use std::sync::Arc;
use std::time::Duration;

use tutorhub_session::config::SessionConfig;
use tutorhub_session::db::{self, PgProfileStore};
use tutorhub_session::error::AppError;
use tutorhub_session::models::SessionState;
use tutorhub_session::navigation::TracingNavigator;
use tutorhub_session::ports::{KeyValueStore, Navigator};
use tutorhub_session::provider::HostedAuthClient;
use tutorhub_session::services::auth::{AuthService, SignInOutcome};
use tutorhub_session::services::bootstrap::SessionBootstrapper;
use tutorhub_session::state::AppState;
use tutorhub_session::storage::FileStore;

/// How long to wait for an auth event to be handled before giving up.
const EVENT_WAIT: Duration = Duration::from_secs(5);

struct Connected {
    state: AppState,
    client: HostedAuthClient,
    navigator: Arc<TracingNavigator>,
    bootstrapper: SessionBootstrapper,
}

impl Connected {
    /// Wait for the next auth event after `seen` to be handled.
    async fn wait_for_event(&self, seen: u64) {
        let handled = self.bootstrapper.wait_for_events(seen + 1);
        if tokio::time::timeout(EVENT_WAIT, handled).await.is_err() {
            tracing::warn!(
                timeout_secs = EVENT_WAIT.as_secs(),
                "Auth event was not handled in time"
            );
        }
    }
}

async fn connect(location: &str) -> Result<Connected, AppError> {
    let config = SessionConfig::from_env()?;

    let local: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.storage_path.clone())?);
    let client = HostedAuthClient::new(&config.auth, Arc::clone(&local));
    let pool = db::create_pool(&config.database_url).await?;
    let navigator = Arc::new(TracingNavigator::at(location));

    let state = AppState::builder(
        Arc::new(client.clone()),
        Arc::new(PgProfileStore::new(pool)),
        navigator.clone(),
    )
    .local_store(local)
    .options(config.bootstrap)
    .build();

    let bootstrapper = SessionBootstrapper::start(state.clone());
    bootstrapper.wait_until_settled().await;

    Ok(Connected {
        state,
        client,
        navigator,
        bootstrapper,
    })
}

#[allow(clippy::print_stdout)]
fn print_state(state: &SessionState) {
    match (&state.identity, &state.profile) {
        (None, _) => println!("Not signed in"),
        (Some(identity), profile) => {
            println!("User:     {}", identity.id);
            if let Some(email) = &identity.email {
                println!("Email:    {email}");
            }
            match profile {
                Some(profile) => {
                    println!("Name:     {}", profile.full_name);
                    println!("Role:     {}", profile.role);
                }
                None => println!("Profile:  (not loaded)"),
            }
        }
    }
    println!("Source:   {:?}", state.source);
}

/// Sign in with email and password.
///
/// A rejected sign-in is reported to the user and is not an error.
///
/// # Errors
///
/// Returns `AppError` if configuration, storage or the database fail.
pub async fn login(email: &str, password: &str, location: &str) -> Result<(), AppError> {
    let connected = connect(location).await?;
    let seen = connected.bootstrapper.handled_events();

    let outcome = AuthService::new(connected.state.clone())
        .sign_in(email, password)
        .await;

    if let SignInOutcome::Success { user_id } = &outcome {
        connected.wait_for_event(seen).await;
        tracing::debug!(%user_id, "Sign-in event handled");
    }

    #[allow(clippy::print_stdout)]
    {
        match outcome {
            SignInOutcome::Success { user_id } => {
                println!("Signed in as {user_id}");
                print_state(&connected.bootstrapper.current());
                println!("Location: {}", connected.navigator.current_location());
            }
            SignInOutcome::Rejected { message } | SignInOutcome::EmailNotConfirmed { message } => {
                println!("{message}");
            }
        }
    }

    connected.bootstrapper.shutdown();
    Ok(())
}

/// Complete a sign-in from an external callback URL.
///
/// # Errors
///
/// Returns `AppError::Provider` if the callback is invalid or rejected.
pub async fn callback(url: &str) -> Result<(), AppError> {
    let connected = connect("/auth/callback").await?;
    let seen = connected.bootstrapper.handled_events();

    let session = connected.client.complete_external_callback(url).await?;
    connected.wait_for_event(seen).await;

    #[allow(clippy::print_stdout)]
    {
        println!("Signed in as {}", session.user.id);
        print_state(&connected.bootstrapper.current());
        println!("Location: {}", connected.navigator.current_location());
    }

    connected.bootstrapper.shutdown();
    Ok(())
}

/// Show the reconciled session.
///
/// # Errors
///
/// Returns `AppError` if configuration, storage or the database fail.
pub async fn whoami() -> Result<(), AppError> {
    let connected = connect("/").await?;
    let state = connected.bootstrapper.current();

    #[allow(clippy::print_stdout)]
    {
        print_state(&state);
        if state.is_signed_in() {
            let landing = connected.bootstrapper.resolver().landing_route(state.role());
            println!("Landing:  {landing}");
        }
    }

    connected.bootstrapper.shutdown();
    Ok(())
}

/// Sign out.
///
/// # Errors
///
/// Returns `AppError::Auth` if the provider could not sign out.
pub async fn logout(location: &str) -> Result<(), AppError> {
    let connected = connect(location).await?;
    let seen = connected.bootstrapper.handled_events();

    AuthService::new(connected.state.clone()).sign_out().await?;
    connected.wait_for_event(seen).await;

    #[allow(clippy::print_stdout)]
    {
        println!("Signed out");
        println!("Location: {}", connected.navigator.current_location());
    }

    connected.bootstrapper.shutdown();
    Ok(())
}
