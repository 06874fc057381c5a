//! TutorHub CLI - Session, landing route and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Where would a mentor land after signing in?
//! th-cli route --role mentor
//!
//! # Pin the landing role (as the password-reset flow does)
//! th-cli remember-role admin
//!
//! # Sign in and follow the redirect
//! th-cli login -e ann@school.edu -p 'correct horse' --location /login
//!
//! # Finish a magic-link sign-in
//! th-cli callback 'https://app.example.com/auth/callback#access_token=...'
//!
//! # Show the reconciled session
//! th-cli whoami
//!
//! # Run profile table migrations
//! th-cli migrate
//! ```
//!
//! # Commands
//!
//! - `route` / `remember-role` / `forget-role` - Landing route resolution (local storage only)
//! - `login` / `callback` / `whoami` / `logout` - Session commands against the hosted auth service
//! - `migrate` - Run database migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorhub_session::config::SentryConfig;
use tutorhub_session::error::AppError;

mod commands;

#[derive(Parser)]
#[command(name = "th-cli")]
#[command(author, version, about = "TutorHub session tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the landing route for a role
    Route {
        /// Role attribute (`student`, `mentor`, `admin`); anything else lands on the root
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Store a role override that wins over the profile role
    RememberRole {
        /// Role to pin (`student`, `mentor`, `admin`)
        role: String,
    },
    /// Remove the stored role override
    ForgetRole,
    /// Sign in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Location to start from
        #[arg(long, default_value = "/login")]
        location: String,
    },
    /// Complete a sign-in from an external callback URL
    Callback {
        /// Full callback URL including its fragment
        url: String,
    },
    /// Show the current session and profile
    Whoami,
    /// Sign out
    Logout {
        /// Location to sign out from
        #[arg(long, default_value = "/")]
        location: String,
    },
    /// Run database migrations
    Migrate,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.environment.clone().map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let _sentry_guard = init_sentry(&SentryConfig::from_env());

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tutorhub_session=info,tutorhub_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.report()),
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Route { role } => commands::route::landing(role.as_deref())?,
        Commands::RememberRole { role } => commands::route::remember(&role)?,
        Commands::ForgetRole => commands::route::forget()?,
        Commands::Login {
            email,
            password,
            location,
        } => commands::session::login(&email, &password, &location).await?,
        Commands::Callback { url } => commands::session::callback(&url).await?,
        Commands::Whoami => commands::session::whoami().await?,
        Commands::Logout { location } => commands::session::logout(&location).await?,
        Commands::Migrate => commands::migrate::run().await?,
    }
    Ok(())
}
