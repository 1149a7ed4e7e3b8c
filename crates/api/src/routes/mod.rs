pub mod health;
pub mod session;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                              WebSocket event stream
///
/// /session                                         snapshot (GET)
/// /session/submit                                  start generate/edit (POST)
/// /session/stop                                    stop in-flight call (POST)
/// /session/undo                                    undo (POST)
/// /session/redo                                    redo (POST)
/// /session/select                                  select history item (POST)
/// /session/reset                                   back to new model (POST)
/// /session/prompt                                  set prompt (PUT)
/// /session/upload                                  upload base image (POST, multipart)
/// /session/error                                   clear error (DELETE)
/// /session/current/download                        current image bytes (GET)
/// /session/assets/{kind}/{key}                     set, remove (PUT, DELETE)
/// /session/assets/{kind}/{key}/upload              upload asset (POST, multipart)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_handler))
        // Session
        .nest("/session", session::router())
}
