//! Virtual-model editing session.
//!
//! [`SessionController`] owns one session: the generate/edit draft, the
//! history with its undo/redo cursor, and the auto-dismissing error slot.
//! It drives an [`ImageBackend`](vmodel_core::backend::ImageBackend) and
//! broadcasts [`SessionEvent`]s to observers.

pub mod controller;
pub mod error_surface;
pub mod events;
pub mod state;

pub use controller::{PendingSubmission, SessionConfig, SessionController, SessionError, SubmitOutcome};
pub use events::{SessionEvent, SessionEvents};
pub use state::{BagKind, Mode, SessionSnapshot};
