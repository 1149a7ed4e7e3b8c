//! The session controller: the only writer of session state.
//!
//! [`SessionController`] owns the [`Session`], the [`ErrorSurface`] and the
//! in-flight bookkeeping. Every mutation runs inside one short critical
//! section; the lock is never held across a backend call.
//!
//! A submission is split in two so a caller can answer synchronously and
//! resolve the call elsewhere:
//!
//! 1. [`SessionController::begin_submit`] validates the draft, captures the
//!    call inputs and marks the session in flight.
//! 2. [`PendingSubmission::run`] awaits the backend and applies, discards or
//!    reports the outcome.
//!
//! Cancellation is cooperative. [`SessionController::stop`] cancels the
//! operation's token and frees the session immediately; the backend call
//! keeps running and its result is dropped when it settles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use vmodel_core::assets::AssetKey;
use vmodel_core::backend::{BackendError, ImageBackend, RawUpload, UploadDecoder};
use vmodel_core::history::HistoryItem;
use vmodel_core::image_asset::ImageAsset;
use vmodel_core::types::ItemId;

use crate::error_surface::{ErrorSurface, DEFAULT_DISMISS_AFTER};
use crate::events::{SessionEvent, SessionEvents};
use crate::state::{BagKind, Mode, Session, SessionSnapshot, SubmissionPlan};

/// Message shown for a failed direct image upload.
pub const MSG_UPLOAD_FAILED: &str = "Failed to upload image.";

/// Message shown when an upload would replace history mid-operation.
pub const MSG_BUSY: &str = "Wait for the current generation to finish or stop it first.";

/// Tunables for a [`SessionController`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long an error stays visible before it is dismissed.
    pub error_dismiss_after: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            error_dismiss_after: DEFAULT_DISMISS_AFTER,
        }
    }
}

/// Why a controller operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Another generate/edit call is still in flight.
    #[error("An operation is already in flight")]
    InFlight,

    /// The request failed a precondition; the message is user-facing.
    #[error("{0}")]
    Validation(String),

    /// An uploaded file could not be decoded.
    #[error("{0}")]
    Decode(String),
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The result was added to history.
    Applied { item_id: ItemId },
    /// The operation was stopped; its result was dropped.
    Discarded,
    /// The backend failed; the message was surfaced.
    Failed { message: String },
}

struct InFlight {
    operation_id: u64,
    cancel: CancellationToken,
}

struct ControllerState {
    session: Session,
    in_flight: Option<InFlight>,
}

/// Owner and sole mutator of one editing session.
pub struct SessionController {
    state: Mutex<ControllerState>,
    backend: Arc<dyn ImageBackend>,
    decoder: Arc<dyn UploadDecoder>,
    errors: ErrorSurface,
    events: SessionEvents,
    next_operation_id: AtomicU64,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        decoder: Arc<dyn UploadDecoder>,
        config: SessionConfig,
    ) -> Self {
        let events = SessionEvents::default();
        Self {
            state: Mutex::new(ControllerState {
                session: Session::new(),
                in_flight: None,
            }),
            backend,
            decoder,
            errors: ErrorSurface::new(config.error_dismiss_after, events.clone()),
            events,
            next_operation_id: AtomicU64::new(0),
        }
    }

    // ---- observers ----

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot::capture(
            &state.session,
            state.in_flight.is_some(),
            self.errors.message(),
        )
    }

    pub fn current_item(&self) -> Option<HistoryItem> {
        self.lock().session.history.current().cloned()
    }

    pub fn mode(&self) -> Mode {
        self.lock().session.mode
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.message()
    }

    // ---- submission ----

    /// Submit the current draft and wait for the outcome.
    pub async fn submit(self: &Arc<Self>) -> Result<SubmitOutcome, SessionError> {
        let pending = self.begin_submit()?;
        Ok(pending.run().await)
    }

    /// Validate the draft and mark the session in flight.
    ///
    /// A submission while another is in flight is refused without touching
    /// the visible error. Validation failures are surfaced and returned.
    pub fn begin_submit(self: &Arc<Self>) -> Result<PendingSubmission, SessionError> {
        let mut state = self.lock();

        if let Some(op) = &state.in_flight {
            tracing::debug!(
                operation_id = op.operation_id,
                "Submission refused, operation in flight",
            );
            return Err(SessionError::InFlight);
        }

        let plan = match state.session.plan_submission() {
            Ok(plan) => plan,
            Err(message) => {
                drop(state);
                tracing::debug!(reason = message, "Submission failed validation");
                self.errors.set_error(message);
                return Err(SessionError::Validation(message.to_string()));
            }
        };

        let operation_id = self.next_operation_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        state.in_flight = Some(InFlight {
            operation_id,
            cancel: cancel.clone(),
        });
        let mode = state.session.mode;
        drop(state);

        self.errors.clear_error();
        tracing::info!(operation_id, ?mode, "Submission started");
        self.events
            .publish(SessionEvent::SubmissionStarted { operation_id, mode });

        Ok(PendingSubmission {
            controller: Arc::clone(self),
            operation_id,
            cancel,
            plan,
        })
    }

    /// Stop the in-flight operation, if any.
    ///
    /// The session is free for a new submission immediately. Returns whether
    /// there was anything to stop.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        let Some(op) = state.in_flight.take() else {
            return false;
        };
        // Cancelled before the slot is visible as free, so settle() never
        // sees a freed slot with a live token.
        op.cancel.cancel();
        drop(state);

        tracing::info!(operation_id = op.operation_id, "Submission stopped");
        self.events.publish(SessionEvent::SubmissionStopped {
            operation_id: op.operation_id,
        });
        true
    }

    /// Apply the settled result of operation `operation_id`.
    fn settle(
        &self,
        operation_id: u64,
        cancel: &CancellationToken,
        plan: SubmissionPlan,
        result: Result<ImageAsset, BackendError>,
    ) -> SubmitOutcome {
        let mut state = self.lock();

        // stop() and reset cancel the token while holding the lock, so both
        // checks see a consistent slot.
        let owns_slot = state
            .in_flight
            .as_ref()
            .is_some_and(|op| op.operation_id == operation_id);
        if cancel.is_cancelled() || !owns_slot {
            drop(state);
            tracing::info!(operation_id, "Discarding result of stopped submission");
            self.events
                .publish(SessionEvent::SubmissionDiscarded { operation_id });
            return SubmitOutcome::Discarded;
        }
        state.in_flight = None;

        match result {
            Ok(image) => {
                let item_id = state.session.apply_result(plan, image);
                let cursor = state.session.history.cursor();
                let len = state.session.history.len();
                drop(state);

                tracing::info!(operation_id, %item_id, len, "Submission applied");
                self.events
                    .publish(SessionEvent::HistoryChanged { cursor, len });
                self.events.publish(SessionEvent::DraftChanged);
                self.events.publish(SessionEvent::SubmissionCompleted {
                    operation_id,
                    item_id,
                });
                SubmitOutcome::Applied { item_id }
            }
            Err(e) => {
                drop(state);
                let message = format!("Failed to generate image: {}", e.cause());
                tracing::error!(operation_id, error = %e, "Submission failed");
                self.errors.set_error(message.clone());
                self.events.publish(SessionEvent::SubmissionFailed {
                    operation_id,
                    error: message.clone(),
                });
                SubmitOutcome::Failed { message }
            }
        }
    }

    // ---- navigation ----

    pub fn undo(&self) -> bool {
        self.navigate(|session| session.history.undo())
    }

    pub fn redo(&self) -> bool {
        self.navigate(|session| session.history.redo())
    }

    /// Select history item `index`. Out of range is refused without change.
    pub fn select_history_index(&self, index: usize) -> Result<(), SessionError> {
        let mut result = Ok(());
        self.navigate(|session| match session.history.move_to(index) {
            Ok(()) => true,
            Err(e) => {
                result = Err(SessionError::Validation(e.to_string()));
                false
            }
        });
        result
    }

    fn navigate(&self, step: impl FnOnce(&mut Session) -> bool) -> bool {
        let mut state = self.lock();
        let moved = step(&mut state.session);
        let cursor = state.session.history.cursor();
        let len = state.session.history.len();
        drop(state);

        if moved {
            tracing::debug!(?cursor, len, "History cursor moved");
            self.events
                .publish(SessionEvent::HistoryChanged { cursor, len });
        }
        moved
    }

    // ---- mode ----

    /// Discard everything and return to new-model mode.
    ///
    /// Any in-flight operation is cancelled; its result will be dropped.
    pub fn reset_to_new_model(&self) {
        let mut state = self.lock();
        if let Some(op) = state.in_flight.take() {
            op.cancel.cancel();
            tracing::info!(operation_id = op.operation_id, "Submission cancelled by reset");
        }
        state.session.reset();
        drop(state);

        self.errors.clear_error();
        tracing::info!("Session reset to new model");
        self.events.publish(SessionEvent::SessionReset);
        self.events.publish(SessionEvent::HistoryChanged {
            cursor: None,
            len: 0,
        });
    }

    // ---- draft ----

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.lock().session.prompt = prompt.into();
        self.events.publish(SessionEvent::DraftChanged);
    }

    pub fn set_asset(&self, kind: BagKind, key: AssetKey, asset: ImageAsset) {
        self.lock().session.bag_mut(kind).set(key, asset);
        tracing::debug!(bag = %kind, %key, "Asset set");
        self.events.publish(SessionEvent::DraftChanged);
    }

    pub fn remove_asset(&self, kind: BagKind, key: AssetKey) {
        self.lock().session.bag_mut(kind).remove(key);
        tracing::debug!(bag = %kind, %key, "Asset removed");
        self.events.publish(SessionEvent::DraftChanged);
    }

    pub fn clear_error(&self) {
        self.errors.clear_error();
    }

    // ---- uploads ----

    /// Decode `upload` and start editing it as a fresh single-item history.
    ///
    /// Refused while a generate/edit call is in flight, checked both before
    /// and after decoding.
    pub async fn upload_image(&self, upload: RawUpload) -> Result<ItemId, SessionError> {
        self.ensure_idle()?;

        let image = match self.decoder.decode(upload).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "Image upload failed");
                self.errors.set_error(MSG_UPLOAD_FAILED);
                return Err(SessionError::Decode(e.to_string()));
            }
        };

        let mut state = self.lock();
        if state.in_flight.is_some() {
            drop(state);
            self.errors.set_error(MSG_BUSY);
            return Err(SessionError::InFlight);
        }
        let item_id = state.session.apply_upload(image);
        let cursor = state.session.history.cursor();
        let len = state.session.history.len();
        drop(state);

        self.errors.clear_error();
        tracing::info!(%item_id, "Uploaded image, now editing");
        self.events
            .publish(SessionEvent::HistoryChanged { cursor, len });
        Ok(item_id)
    }

    /// Decode `upload` and store it under `key` in the chosen bag.
    pub async fn upload_asset(
        &self,
        kind: BagKind,
        key: AssetKey,
        upload: RawUpload,
    ) -> Result<(), SessionError> {
        match self.decoder.decode(upload).await {
            Ok(asset) => {
                self.set_asset(kind, key, asset);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(bag = %kind, %key, error = %e, "Asset upload failed");
                self.errors.set_error(format!("Failed to upload {key}."));
                Err(SessionError::Decode(e.to_string()))
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_in_flight() {
            self.errors.set_error(MSG_BUSY);
            return Err(SessionError::InFlight);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A submission that passed validation and holds the in-flight slot.
///
/// Dropping it without calling [`run`](Self::run) leaves the session in
/// flight until [`SessionController::stop`] or a reset.
#[must_use = "a pending submission does nothing until run"]
pub struct PendingSubmission {
    controller: Arc<SessionController>,
    operation_id: u64,
    cancel: CancellationToken,
    plan: SubmissionPlan,
}

impl PendingSubmission {
    pub fn operation_id(&self) -> u64 {
        self.operation_id
    }

    /// Await the backend call and apply its outcome.
    pub async fn run(self) -> SubmitOutcome {
        let backend = Arc::clone(&self.controller.backend);
        let result = match &self.plan {
            SubmissionPlan::Generate { assets, prompt } => backend.generate(assets, prompt).await,
            SubmissionPlan::Edit {
                base,
                prompt,
                references,
                ..
            } => backend.edit(base, prompt, references).await,
        };

        self.controller
            .settle(self.operation_id, &self.cancel, self.plan, result)
    }
}
