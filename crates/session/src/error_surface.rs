//! The single user-visible error slot.
//!
//! [`ErrorSurface`] holds at most one message. Each [`set_error`] replaces
//! the previous message and restarts a dismissal timer; the timer of an
//! overwritten message is aborted and, should it fire anyway, its stale
//! generation number keeps it from clearing the newer message.
//!
//! [`set_error`]: ErrorSurface::set_error

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::events::{SessionEvent, SessionEvents};

/// Default time a message stays visible.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Default)]
struct SurfaceState {
    message: Option<String>,
    /// Bumped on every set/clear so a late timer can tell it is stale.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl SurfaceState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Last-error holder with timed auto-dismissal.
pub struct ErrorSurface {
    state: Arc<Mutex<SurfaceState>>,
    dismiss_after: Duration,
    events: SessionEvents,
}

impl ErrorSurface {
    pub fn new(dismiss_after: Duration, events: SessionEvents) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState::default())),
            dismiss_after,
            events,
        }
    }

    /// Show `message`, replacing any current one, and restart the timer.
    ///
    /// Outside a Tokio runtime no timer is armed and the message stays until
    /// [`clear_error`](Self::clear_error).
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        let mut state = lock(&self.state);
        state.cancel_timer();
        state.generation += 1;
        state.message = Some(message.clone());
        state.timer = self.spawn_timer(state.generation);
        drop(state);

        tracing::warn!(error = %message, "Session error raised");
        self.events.publish(SessionEvent::ErrorRaised { message });
    }

    /// Dismiss the current message, if any, and cancel its timer.
    pub fn clear_error(&self) {
        let mut state = lock(&self.state);
        state.cancel_timer();
        state.generation += 1;
        let had_message = state.message.take().is_some();
        drop(state);

        if had_message {
            self.events.publish(SessionEvent::ErrorCleared);
        }
    }

    pub fn message(&self) -> Option<String> {
        lock(&self.state).message.clone()
    }

    fn spawn_timer(&self, generation: u64) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, error will not auto-dismiss");
            return None;
        };

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let delay = self.dismiss_after;

        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;

            let mut state = lock(&state);
            if state.generation != generation {
                return;
            }
            state.message = None;
            state.timer = None;
            drop(state);

            tracing::debug!("Session error auto-dismissed");
            events.publish(SessionEvent::ErrorCleared);
        }))
    }
}

impl Drop for ErrorSurface {
    fn drop(&mut self) {
        lock(&self.state).cancel_timer();
    }
}

fn lock(state: &Mutex<SurfaceState>) -> MutexGuard<'_, SurfaceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
