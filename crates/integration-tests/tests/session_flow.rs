//! Integration tests for session bootstrap, reconciliation, redirects and
//! sign-out.

use std::time::Duration;

use tutorhub_core::{Identity, Profile, Role, UserId};
use tutorhub_integration_tests::{TestContext, identity, profile, session_for};
use tutorhub_session::models::StateSource;
use tutorhub_session::navigation::{Navigation, NavigationKind};
use tutorhub_session::ports::{AuthEvent, KeyValueStore};
use tutorhub_session::storage::{keys, read_json, write_json};

fn soft(path: &str) -> Navigation {
    Navigation {
        kind: NavigationKind::Soft,
        path: path.to_owned(),
    }
}

// =============================================================================
// First sign-in
// =============================================================================

#[tokio::test]
async fn test_first_sign_in_synthesizes_profile_from_metadata() {
    let ctx = TestContext::at("/login");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        Some("Ann"),
        Some("mentor"),
    ))));
    bootstrapper.wait_for_events(1).await;

    let expected = Profile {
        id: UserId::new("u1"),
        email: String::new(),
        full_name: "Ann".to_owned(),
        role: Role::Mentor,
        phone: None,
    };
    assert_eq!(bootstrapper.current().profile, Some(expected.clone()));
    assert_eq!(ctx.profiles.insert_attempts(), 1);
    assert_eq!(ctx.profiles.get(&UserId::new("u1")), Some(expected));
    assert_eq!(ctx.navigator.navigations(), vec![soft("/mentor-dashboard")]);
}

#[tokio::test]
async fn test_missing_role_metadata_defaults_to_student() {
    let ctx = TestContext::at("/login");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider
        .emit(AuthEvent::signed_in(session_for(identity("u1", None, None))));
    bootstrapper.wait_for_events(1).await;

    let state = bootstrapper.current();
    assert_eq!(state.profile.map(|p| p.role), Some(Role::Student));
    assert_eq!(ctx.navigator.navigations(), vec![soft("/student-dashboard")]);
}

#[tokio::test]
async fn test_profile_insert_failure_still_publishes_profile() {
    let ctx = TestContext::at("/login");
    ctx.profiles.fail_inserts(true);
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        None,
        Some("admin"),
    ))));
    bootstrapper.wait_for_events(1).await;

    assert_eq!(bootstrapper.current().role(), Some(Role::Admin));
    assert!(ctx.profiles.get(&UserId::new("u1")).is_none());
    assert_eq!(ctx.navigator.navigations(), vec![soft("/admin-dashboard")]);
}

// =============================================================================
// Idempotent reconciliation
// =============================================================================

#[tokio::test]
async fn test_sign_in_then_refresh_publishes_same_profile() {
    let ctx = TestContext::at("/login");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;
    let session = session_for(identity("u1", Some("Ann"), Some("mentor")));

    ctx.provider.emit(AuthEvent::signed_in(session.clone()));
    bootstrapper.wait_for_events(1).await;
    let first = bootstrapper.current().profile;

    ctx.provider.emit(AuthEvent::token_refreshed(session));
    bootstrapper.wait_for_events(2).await;
    let second = bootstrapper.current().profile;

    assert!(first.is_some());
    assert_eq!(first, second);
    // The second pass finds the row the first pass inserted.
    assert_eq!(ctx.profiles.insert_attempts(), 1);
}

#[tokio::test]
async fn test_reconciliation_is_idempotent_when_inserts_fail() {
    let ctx = TestContext::at("/login");
    ctx.profiles.fail_inserts(true);
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;
    let session = session_for(identity("u1", Some("Ann"), Some("mentor")));

    ctx.provider.emit(AuthEvent::signed_in(session.clone()));
    bootstrapper.wait_for_events(1).await;
    let first = bootstrapper.current().profile;

    ctx.provider.emit(AuthEvent::token_refreshed(session));
    bootstrapper.wait_for_events(2).await;

    assert_eq!(bootstrapper.current().profile, first);
    assert_eq!(ctx.profiles.insert_attempts(), 2);
}

// =============================================================================
// Cache versus authoritative state
// =============================================================================

#[tokio::test]
async fn test_authoritative_profile_replaces_cached_one() {
    let ctx = TestContext::at("/").with_profiles([profile("u1", Role::Admin)]);
    write_json(ctx.local.as_ref(), keys::CACHED_USER, &Identity::new("u1", None));
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &profile("u1", Role::Student));
    ctx.provider
        .set_session(Some(session_for(identity("u1", None, None))));

    let bootstrapper = ctx.start();
    let cached = bootstrapper.current();
    assert_eq!(cached.source, StateSource::Cache);
    assert_eq!(cached.role(), Some(Role::Student));

    let settled = bootstrapper.wait_until_settled().await;
    assert_eq!(settled.source, StateSource::Authoritative);
    assert_eq!(settled.role(), Some(Role::Admin));

    let stored: Option<Profile> = read_json(ctx.local.as_ref(), keys::CACHED_PROFILE);
    assert_eq!(stored.map(|p| p.role), Some(Role::Admin));
    assert_eq!(
        ctx.local.get(keys::CONFIRMED_ROLE).ok().flatten().as_deref(),
        Some("admin")
    );
}

#[tokio::test]
async fn test_unreachable_provider_keeps_cached_profile() {
    let ctx = TestContext::at("/");
    let cached = profile("u1", Role::Mentor);
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &cached);
    ctx.provider.set_unreachable(true);

    let bootstrapper = ctx.start();
    let settled = bootstrapper.wait_until_settled().await;

    assert_eq!(settled.profile, Some(cached));
    assert_eq!(settled.source, StateSource::Cache);
    assert!(!settled.loading);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_fetch_keeps_cached_student_role() {
    let ctx = TestContext::at("/");
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &profile("u1", Role::Student));
    ctx.provider.set_hanging(true);

    let bootstrapper = ctx.start();
    assert_eq!(bootstrapper.current().role(), Some(Role::Student));

    let settled = bootstrapper.wait_until_settled().await;
    assert_eq!(settled.role(), Some(Role::Student));
    assert_eq!(settled.source, StateSource::Cache);
    assert!(!settled.loading);
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_fetch_stays_loading_on_cached_state() {
    let mut ctx = TestContext::at("/");
    ctx.options.session_timeout = None;
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &profile("u1", Role::Mentor));
    ctx.provider.set_hanging(true);

    let bootstrapper = ctx.start();
    tokio::time::sleep(Duration::from_secs(3600)).await;

    let state = bootstrapper.current();
    assert!(state.loading);
    assert_eq!(state.role(), Some(Role::Mentor));
}

#[tokio::test]
async fn test_failed_lookup_keeps_same_users_profile() {
    let ctx = TestContext::at("/");
    let cached = profile("u1", Role::Mentor);
    write_json(ctx.local.as_ref(), keys::CACHED_USER, &Identity::new("u1", None));
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &cached);
    ctx.provider
        .set_session(Some(session_for(identity("u1", None, None))));
    ctx.profiles.fail_lookups(true);

    let bootstrapper = ctx.start();
    let settled = bootstrapper.wait_until_settled().await;

    assert_eq!(settled.source, StateSource::Authoritative);
    assert_eq!(settled.profile, Some(cached));
}

#[tokio::test]
async fn test_failed_lookup_drops_other_users_profile() {
    let ctx = TestContext::at("/");
    write_json(ctx.local.as_ref(), keys::CACHED_USER, &Identity::new("u2", None));
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &profile("u2", Role::Admin));
    ctx.provider
        .set_session(Some(session_for(identity("u1", None, Some("student")))));
    ctx.profiles.fail_lookups(true);

    let bootstrapper = ctx.start();
    let settled = bootstrapper.wait_until_settled().await;

    assert_eq!(
        settled.identity.as_ref().map(|i| i.id.clone()),
        Some(UserId::new("u1"))
    );
    assert_eq!(settled.profile, None);
    // The identity's role hint still answers `role()`.
    assert_eq!(settled.role(), Some(Role::Student));
}

#[tokio::test]
async fn test_no_session_clears_stale_cache() {
    let ctx = TestContext::at("/");
    write_json(ctx.local.as_ref(), keys::CACHED_USER, &Identity::new("u1", None));
    write_json(ctx.local.as_ref(), keys::CACHED_PROFILE, &profile("u1", Role::Mentor));

    let bootstrapper = ctx.start();
    let settled = bootstrapper.wait_until_settled().await;

    assert!(!settled.is_signed_in());
    assert_eq!(settled.profile, None);
    assert!(!ctx.local.contains(keys::CACHED_USER));
    assert!(!ctx.local.contains(keys::CACHED_PROFILE));
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_back_to_back_sign_ins_navigate_once() {
    let ctx = TestContext::at("/login");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        None,
        Some("mentor"),
    ))));
    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u2",
        None,
        Some("admin"),
    ))));
    bootstrapper.wait_for_events(2).await;

    assert_eq!(ctx.navigator.navigations(), vec![soft("/mentor-dashboard")]);
    assert!(bootstrapper.redirect_guard().is_active());
    assert!(ctx.session.contains(keys::REDIRECT_IN_PROGRESS));

    tokio::time::sleep(ctx.options.redirect_settle + Duration::from_millis(1)).await;
    assert!(!bootstrapper.redirect_guard().is_active());
    assert!(!ctx.session.contains(keys::REDIRECT_IN_PROGRESS));

    // Once the flight has settled the next sign-in redirects again.
    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u2",
        None,
        Some("admin"),
    ))));
    bootstrapper.wait_for_events(3).await;
    assert_eq!(
        ctx.navigator.navigations(),
        vec![soft("/mentor-dashboard"), soft("/admin-dashboard")]
    );
}

#[tokio::test]
async fn test_external_callback_replaces_location() {
    let ctx = TestContext::at("/auth/callback");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider
        .emit(AuthEvent::signed_in_from_callback(session_for(identity(
            "u1", None, None,
        ))));
    bootstrapper.wait_for_events(1).await;

    assert_eq!(
        ctx.navigator.navigations(),
        vec![Navigation {
            kind: NavigationKind::Hard,
            path: "/student-dashboard".to_owned(),
        }]
    );
}

#[tokio::test]
async fn test_sign_in_inside_own_section_does_not_navigate() {
    let ctx = TestContext::at("/mentor-dashboard/calendar");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        None,
        Some("mentor"),
    ))));
    bootstrapper.wait_for_events(1).await;

    assert!(ctx.navigator.navigations().is_empty());
    assert!(!bootstrapper.redirect_guard().is_active());
}

#[tokio::test]
async fn test_sign_in_inside_other_section_redirects() {
    let ctx = TestContext::at("/admin-dashboard/users");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        None,
        Some("student"),
    ))));
    bootstrapper.wait_for_events(1).await;

    assert_eq!(ctx.navigator.navigations(), vec![soft("/student-dashboard")]);
}

#[tokio::test]
async fn test_stored_override_decides_redirect() {
    let ctx = TestContext::at("/login");
    ctx.local
        .set(keys::STORED_ROLE, "admin")
        .unwrap_or_else(|e| panic!("{e}"));
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        None,
        Some("student"),
    ))));
    bootstrapper.wait_for_events(1).await;

    assert_eq!(ctx.navigator.navigations(), vec![soft("/admin-dashboard")]);
}

#[tokio::test]
async fn test_redirect_falls_back_to_role_hint_without_profile() {
    let ctx = TestContext::at("/login");
    ctx.profiles.fail_lookups(true);
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    ctx.provider.emit(AuthEvent::signed_in(session_for(identity(
        "u1",
        None,
        Some("mentor"),
    ))));
    bootstrapper.wait_for_events(1).await;

    assert_eq!(bootstrapper.current().profile, None);
    assert_eq!(ctx.navigator.navigations(), vec![soft("/mentor-dashboard")]);
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_out_on_dashboard_sub_path_returns_to_root_once() {
    let ctx = TestContext::at("/mentor-dashboard/sessions");
    let bootstrapper = ctx.start();
    bootstrapper.wait_until_settled().await;

    // A redirect still in flight when the user signs out.
    std::mem::forget(bootstrapper.redirect_guard().try_acquire());
    assert!(ctx.session.contains(keys::REDIRECT_IN_PROGRESS));

    ctx.provider.emit(AuthEvent::signed_out());
    bootstrapper.wait_for_events(1).await;

    assert!(!bootstrapper.redirect_guard().is_active());
    assert!(!ctx.session.contains(keys::REDIRECT_IN_PROGRESS));
    assert_eq!(ctx.navigator.navigations(), vec![soft("/")]);
}

#[tokio::test]
async fn test_sign_out_clears_state_and_cache() {
    let ctx = TestContext::at("/about");
    ctx.provider
        .set_session(Some(session_for(identity("u1", None, Some("mentor")))));
    ctx.local
        .set(keys::STORED_ROLE, "mentor")
        .unwrap_or_else(|e| panic!("{e}"));

    let bootstrapper = ctx.start();
    let settled = bootstrapper.wait_until_settled().await;
    assert!(settled.is_signed_in());
    assert!(ctx.local.contains(keys::CACHED_PROFILE));

    ctx.provider.emit(AuthEvent::signed_out());
    bootstrapper.wait_for_events(1).await;

    let state = bootstrapper.current();
    assert!(!state.is_signed_in());
    assert_eq!(state.profile, None);
    assert_eq!(state.source, StateSource::Authoritative);
    for key in keys::SIGN_OUT_CLEARS {
        assert!(!ctx.local.contains(key), "{key} should be cleared");
    }
    // Outside any dashboard there is nowhere to leave.
    assert!(ctx.navigator.navigations().is_empty());
}
