//! WebSocket stream of session events.
//!
//! Each connection receives one `snapshot` frame on connect, then every
//! [`SessionEvent`](vmodel_session::SessionEvent) as a JSON text frame, and
//! a Ping every [`HEARTBEAT_INTERVAL`].

mod handler;

pub use handler::{ws_handler, HEARTBEAT_INTERVAL};
