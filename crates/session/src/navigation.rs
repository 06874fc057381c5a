//! Navigator adapters.
//!
//! - [`RecordingNavigator`] - Tracks location and records every navigation
//! - [`TracingNavigator`] - Tracks location and logs navigations (CLI use)

use std::sync::{Mutex, PoisonError};

use crate::ports::Navigator;

/// How a navigation was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Client-side navigation.
    Soft,
    /// Location replacement.
    Hard,
}

/// A navigation issued through a [`Navigator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub kind: NavigationKind,
    pub path: String,
}

/// Navigator that records navigations and moves its location accordingly.
#[derive(Debug)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    history: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    /// Create a navigator sitting at `location`.
    #[must_use]
    pub fn at(location: &str) -> Self {
        Self {
            location: Mutex::new(location.to_owned()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Move without recording a navigation (user clicked a link).
    pub fn set_location(&self, location: &str) {
        location.clone_into(&mut self.location.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Every navigation issued so far.
    #[must_use]
    pub fn navigations(&self) -> Vec<Navigation> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, kind: NavigationKind, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Navigation {
                kind,
                path: path.to_owned(),
            });
        self.set_location(path);
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        self.record(NavigationKind::Soft, path);
    }

    fn replace_location(&self, path: &str) {
        self.record(NavigationKind::Hard, path);
    }
}

/// Navigator for headless use: keeps a location and logs each move.
#[derive(Debug)]
pub struct TracingNavigator {
    location: Mutex<String>,
}

impl TracingNavigator {
    /// Create a navigator sitting at `location`.
    #[must_use]
    pub fn at(location: &str) -> Self {
        Self {
            location: Mutex::new(location.to_owned()),
        }
    }

    fn move_to(&self, kind: NavigationKind, path: &str) {
        let mut location = self.location.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = %location, to = path, ?kind, "Navigating");
        path.clone_into(&mut location);
    }
}

impl Navigator for TracingNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        self.move_to(NavigationKind::Soft, path);
    }

    fn replace_location(&self, path: &str) {
        self.move_to(NavigationKind::Hard, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_navigator_tracks_moves() {
        let navigator = RecordingNavigator::at("/login");
        navigator.navigate("/student-dashboard");
        navigator.replace_location("/mentor-dashboard");

        assert_eq!(navigator.current_location(), "/mentor-dashboard");
        assert_eq!(
            navigator.navigations(),
            vec![
                Navigation {
                    kind: NavigationKind::Soft,
                    path: "/student-dashboard".to_owned(),
                },
                Navigation {
                    kind: NavigationKind::Hard,
                    path: "/mentor-dashboard".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_set_location_is_not_recorded() {
        let navigator = RecordingNavigator::at("/");
        navigator.set_location("/admin-dashboard/users");
        assert!(navigator.navigations().is_empty());
        assert_eq!(navigator.current_location(), "/admin-dashboard/users");
    }

    #[test]
    fn test_tracing_navigator_moves() {
        let navigator = TracingNavigator::at("/login");
        navigator.replace_location("/admin-dashboard");
        assert_eq!(navigator.current_location(), "/admin-dashboard");
    }
}
