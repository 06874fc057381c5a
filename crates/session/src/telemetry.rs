//! Sentry context for the signed-in user and auth redirects.
//!
//! Every function here is a no-op until the binary initializes Sentry.

use tutorhub_core::Identity;

/// Attach `identity` to subsequent Sentry events.
pub fn identify(identity: &Identity) {
    let user = sentry::User {
        id: Some(identity.id.to_string()),
        email: identity.email.clone(),
        ..Default::default()
    };
    sentry::configure_scope(|scope| scope.set_user(Some(user)));
}

/// Detach any user from subsequent Sentry events.
pub fn forget_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record an auth-driven navigation from `from` to `to`.
pub fn redirect_breadcrumb(from: &str, to: &str) {
    let data = [("from", from), ("to", to)]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), serde_json::Value::from(v)))
        .collect();

    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some("navigation".to_owned()),
        message: Some("Auth redirect".to_owned()),
        level: sentry::Level::Info,
        data,
        ..Default::default()
    });
}
