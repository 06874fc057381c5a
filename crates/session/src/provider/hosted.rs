//! Hosted auth service client.
//!
//! Talks to the service's REST API:
//!
//! - `POST auth/v1/token?grant_type=password` - Password sign-in
//! - `POST auth/v1/token?grant_type=refresh_token` - Token refresh
//! - `GET auth/v1/user` - Validate an access token and load the identity
//! - `POST auth/v1/logout` - Revoke the session
//!
//! The token pair is persisted in local storage under
//! [`keys::AUTH_TOKEN`](crate::storage::keys::AUTH_TOKEN) so a restarted
//! process picks the session back up.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = HostedAuthClient::new(&config.auth, local_store.clone());
//! let email = Email::parse("ann@school.edu")?;
//! let session = client.sign_in_with_password(&email, "hunter2").await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use tutorhub_core::{Email, Identity, Session};

use super::ProviderError;
use crate::config::AuthServiceConfig;
use crate::ports::{AuthEvent, AuthProvider, AuthSubscription, KeyValueStore};
use crate::storage::{keys, read_json, remove_logged, write_json};

const EVENT_CAPACITY: usize = 32;

/// Refresh tokens that expire within this many seconds.
const REFRESH_MARGIN_SECS: i64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Identity,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    fn message(&self) -> String {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("unknown error")
            .to_owned()
    }
}

/// Token pair persisted in local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    expires_at: Option<i64>,
}

/// First step `get_session` takes with a stored token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenPlan {
    /// Ask the service whether the access token is still good.
    Validate,
    /// Skip validation and trade the refresh token for a new pair.
    Refresh,
}

impl PersistedToken {
    fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now.timestamp() + REFRESH_MARGIN_SECS)
    }

    /// An expiring token without a refresh token may still be valid for a
    /// few seconds, so it is validated rather than dropped.
    fn plan(&self, now: DateTime<Utc>) -> TokenPlan {
        if self.expires_soon(now) && self.refresh_token.is_some() {
            TokenPlan::Refresh
        } else {
            TokenPlan::Validate
        }
    }

    fn into_session(self, user: Identity) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            user,
        }
    }
}

/// Map a non-success response to a typed error.
async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    classify_error(status, &body)
}

fn classify_error(status: StatusCode, body: &ErrorBody) -> ProviderError {
    let message = body.message();

    if body.code() == Some("email_not_confirmed")
        || message.to_lowercase().contains("email not confirmed")
    {
        return ProviderError::EmailNotConfirmed;
    }
    if matches!(body.code(), Some("invalid_grant" | "invalid_credentials")) {
        return ProviderError::InvalidCredentials(message);
    }

    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the hosted auth service.
///
/// Cheap to clone; clones share the HTTP client, storage and event channel.
#[derive(Clone)]
pub struct HostedAuthClient {
    inner: Arc<HostedAuthClientInner>,
}

struct HostedAuthClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    storage: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl HostedAuthClient {
    /// Create a new client.
    ///
    /// `storage` is the persistent local store the token pair is kept in.
    #[must_use]
    pub fn new(config: &AuthServiceConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(HostedAuthClientInner {
                client: reqwest::Client::new(),
                base_url,
                anon_key: config.anon_key.clone(),
                storage,
                events,
            }),
        }
    }

    /// Complete a sign-in that returned through an external callback URL
    /// (e.g. a magic link).
    ///
    /// The URL fragment carries `access_token`, `refresh_token` and
    /// `expires_in`. On success the session is persisted and a `SignedIn`
    /// event with `ExternalCallback` origin is emitted.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidCallback` if the fragment reports an
    /// error, lacks an access token, or the token is rejected.
    pub async fn complete_external_callback(
        &self,
        callback_url: &str,
    ) -> Result<Session, ProviderError> {
        let url = Url::parse(callback_url)
            .map_err(|e| ProviderError::InvalidCallback(e.to_string()))?;
        let fragment = url
            .fragment()
            .ok_or_else(|| ProviderError::InvalidCallback("missing URL fragment".to_owned()))?;

        let params = parse_fragment(fragment);
        if let Some(description) = params.error_description {
            return Err(ProviderError::InvalidCallback(description));
        }
        let access_token = params
            .access_token
            .ok_or_else(|| ProviderError::InvalidCallback("missing access_token".to_owned()))?;

        let user = self
            .fetch_user(&access_token)
            .await?
            .ok_or_else(|| ProviderError::InvalidCallback("access token rejected".to_owned()))?;

        let token = PersistedToken {
            access_token,
            refresh_token: params.refresh_token,
            expires_at: params
                .expires_in
                .map(|secs| Utc::now().timestamp() + secs),
        };
        write_json(self.inner.storage.as_ref(), keys::AUTH_TOKEN, &token);

        let session = token.into_session(user);
        tracing::info!(user_id = %session.user.id, "Completed external sign-in callback");
        self.emit(AuthEvent::signed_in_from_callback(session.clone()));
        Ok(session)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<TokenResponse, ProviderError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.request(Method::POST, url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Load the identity for an access token. `None` if the token is rejected.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<Identity>, ProviderError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .request(Method::GET, url)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(error_from_response(response).await),
        }
    }

    /// Persist a fresh token response and turn it into a session.
    fn store_tokens(&self, response: TokenResponse) -> Session {
        let expires_at = response.expires_at.or_else(|| {
            response
                .expires_in
                .map(|secs| Utc::now().timestamp() + secs)
        });
        let token = PersistedToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        };
        write_json(self.inner.storage.as_ref(), keys::AUTH_TOKEN, &token);
        token.into_session(response.user)
    }

    fn forget_tokens(&self) {
        remove_logged(self.inner.storage.as_ref(), keys::AUTH_TOKEN);
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<Session>, ProviderError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        match self.token_grant("refresh_token", &body).await {
            Ok(response) => {
                let session = self.store_tokens(response);
                tracing::debug!(user_id = %session.user.id, "Refreshed access token");
                self.emit(AuthEvent::token_refreshed(session.clone()));
                Ok(Some(session))
            }
            Err(ProviderError::InvalidCredentials(_))
            | Err(ProviderError::Api {
                status: 400 | 401 | 403,
                ..
            }) => {
                tracing::info!("Refresh token rejected, dropping stored session");
                self.forget_tokens();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthProvider for HostedAuthClient {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(token) = read_json::<PersistedToken>(self.inner.storage.as_ref(), keys::AUTH_TOKEN)
        else {
            return Ok(None);
        };

        if token.plan(Utc::now()) == TokenPlan::Validate {
            if let Some(user) = self.fetch_user(&token.access_token).await? {
                return Ok(Some(token.into_session(user)));
            }
            tracing::debug!("Stored access token rejected");
        }

        match token.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh(refresh_token).await,
            None => {
                self.forget_tokens();
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password,
        });
        let response = self.token_grant("password", &body).await?;
        let session = self.store_tokens(response);

        tracing::info!(user_id = %session.user.id, "Signed in with password");
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(token) = read_json::<PersistedToken>(self.inner.storage.as_ref(), keys::AUTH_TOKEN)
        {
            let url = self.endpoint("auth/v1/logout")?;
            match self
                .request(Method::POST, url)
                .bearer_auth(&token.access_token)
                .send()
                .await
            {
                Ok(response)
                    if response.status().is_success()
                        || matches!(
                            response.status(),
                            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
                        ) => {}
                Ok(response) => {
                    let status = response.status();
                    tracing::warn!(%status, "Auth service refused logout, clearing locally");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Logout request failed, clearing locally");
                }
            }
        }

        self.forget_tokens();
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.inner.events.subscribe())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback parsing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
struct CallbackParams {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error_description: Option<String>,
}

fn parse_fragment(fragment: &str) -> CallbackParams {
    let mut params = CallbackParams::default();
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" => params.access_token = Some(value.into_owned()),
            "refresh_token" => params.refresh_token = Some(value.into_owned()),
            "expires_in" => params.expires_in = value.parse().ok(),
            "error_description" => params.error_description = Some(value.into_owned()),
            _ => {}
        }
    }
    params
}
