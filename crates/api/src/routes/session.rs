//! Route definitions for the `/session` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Routes mounted at `/session`.
///
/// ```text
/// GET    /                                -> get_snapshot
/// POST   /submit                          -> submit
/// POST   /stop                            -> stop
/// POST   /undo                            -> undo
/// POST   /redo                            -> redo
/// POST   /select                          -> select
/// POST   /reset                           -> reset
/// PUT    /prompt                          -> set_prompt
/// POST   /upload                          -> upload_image
/// DELETE /error                           -> clear_error
/// GET    /current/download                -> download_current
/// PUT    /assets/{kind}/{key}             -> set_asset
/// DELETE /assets/{kind}/{key}             -> remove_asset
/// POST   /assets/{kind}/{key}/upload      -> upload_asset
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(session::get_snapshot))
        .route("/submit", post(session::submit))
        .route("/stop", post(session::stop))
        .route("/undo", post(session::undo))
        .route("/redo", post(session::redo))
        .route("/select", post(session::select))
        .route("/reset", post(session::reset))
        .route("/prompt", put(session::set_prompt))
        .route("/upload", post(session::upload_image))
        .route("/error", delete(session::clear_error))
        .route("/current/download", get(session::download_current))
        .route(
            "/assets/{kind}/{key}",
            put(session::set_asset).delete(session::remove_asset),
        )
        .route("/assets/{kind}/{key}/upload", post(session::upload_asset))
}
