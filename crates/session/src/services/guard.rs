//! Single-flight redirect guard.
//!
//! At most one auth-driven redirect may be in flight. Acquiring the guard
//! yields a [`RedirectPermit`]; the flight ends when the permit is released,
//! when its settle window elapses, when it is dropped, or when the safety
//! timer fires. There is no path that leaves the guard held forever.
//!
//! ```text
//! IDLE --try_acquire--> REDIRECTING --release / settle / drop / timeout / clear--> IDLE
//! ```
//!
//! While a flight is active the session store holds
//! [`keys::REDIRECT_IN_PROGRESS`] = `"true"` so other observers can see it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::ports::KeyValueStore;
use crate::storage::{keys, remove_logged};

struct Flight {
    id: u64,
    timers: Vec<JoinHandle<()>>,
}

struct GuardInner {
    flight: Mutex<Option<Flight>>,
    next_id: AtomicU64,
    safety_timeout: Duration,
    session_store: Arc<dyn KeyValueStore>,
}

/// Guard serializing auth-driven redirects.
#[derive(Clone)]
pub struct RedirectGuard {
    inner: Arc<GuardInner>,
}

impl RedirectGuard {
    /// Create an idle guard.
    ///
    /// Must be used from within a tokio runtime; acquiring arms a timer task.
    #[must_use]
    pub fn new(session_store: Arc<dyn KeyValueStore>, safety_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                flight: Mutex::new(None),
                next_id: AtomicU64::new(1),
                safety_timeout,
                session_store,
            }),
        }
    }

    /// Start a redirect flight, or `None` if one is already in flight.
    #[must_use]
    pub fn try_acquire(&self) -> Option<RedirectPermit> {
        let mut flight = self.lock();
        if flight.is_some() {
            return None;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let safety_timer = {
            let guard = self.clone();
            let timeout = self.inner.safety_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if guard.release_flight(id) {
                    tracing::warn!(
                        timeout_ms = timeout.as_millis(),
                        "Redirect guard timed out, releasing"
                    );
                }
            })
        };
        *flight = Some(Flight {
            id,
            timers: vec![safety_timer],
        });
        drop(flight);

        if let Err(e) = self
            .inner
            .session_store
            .set(keys::REDIRECT_IN_PROGRESS, "true")
        {
            tracing::warn!(error = %e, "Failed to mirror redirect flag");
        }

        Some(RedirectPermit {
            guard: self.clone(),
            id,
            armed: true,
        })
    }

    /// Whether a redirect is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// End any flight unconditionally.
    pub fn clear(&self) {
        let taken = self.lock().take();
        if let Some(flight) = taken {
            self.finish(flight);
        } else {
            remove_logged(self.inner.session_store.as_ref(), keys::REDIRECT_IN_PROGRESS);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Flight>> {
        self.inner
            .flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// End flight `id` if it is still the current one.
    fn release_flight(&self, id: u64) -> bool {
        let taken = {
            let mut flight = self.lock();
            if flight.as_ref().is_some_and(|f| f.id == id) {
                flight.take()
            } else {
                None
            }
        };

        taken.is_some_and(|flight| {
            self.finish(flight);
            true
        })
    }

    fn attach_timer(&self, id: u64, timer: JoinHandle<()>) {
        let mut flight = self.lock();
        match flight.as_mut() {
            Some(current) if current.id == id => current.timers.push(timer),
            _ => timer.abort(),
        }
    }

    fn finish(&self, flight: Flight) {
        for timer in flight.timers {
            timer.abort();
        }
        remove_logged(self.inner.session_store.as_ref(), keys::REDIRECT_IN_PROGRESS);
    }
}

/// Proof of holding the redirect guard.
///
/// Dropping an unreleased permit ends the flight.
pub struct RedirectPermit {
    guard: RedirectGuard,
    id: u64,
    armed: bool,
}

impl RedirectPermit {
    /// End the flight now.
    pub fn release(mut self) {
        self.armed = false;
        self.guard.release_flight(self.id);
    }

    /// Keep the flight for `settle`, then end it.
    ///
    /// Events arriving inside the window see the guard held and skip
    /// their own redirect.
    pub fn release_after(mut self, settle: Duration) {
        self.armed = false;
        let guard = self.guard.clone();
        let id = self.id;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            guard.release_flight(id);
        });
        self.guard.attach_timer(id, timer);
    }
}

impl Drop for RedirectPermit {
    fn drop(&mut self) {
        if self.armed {
            self.guard.release_flight(self.id);
        }
    }
}
