//! Handlers for the `/session` resource.
//!
//! Every handler is a thin adapter over [`SessionController`]: it parses the
//! request, calls one controller operation and answers with the resulting
//! snapshot. Submissions are accepted synchronously and resolved on a
//! background task; their outcome reaches clients through the WebSocket
//! event stream and later snapshots.
//!
//! [`SessionController`]: vmodel_session::SessionController

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use vmodel_core::assets::AssetKey;
use vmodel_core::backend::RawUpload;
use vmodel_core::image_asset::ImageAsset;
use vmodel_core::types::ItemId;
use vmodel_session::{BagKind, SessionSnapshot};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

type SnapshotResponse = AppResult<Json<DataResponse<SessionSnapshot>>>;

/// Request body for `PUT /session/prompt`.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Request body for `POST /session/select`.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

/// Request body for `PUT /session/assets/{kind}/{key}`.
#[derive(Debug, Deserialize)]
pub struct SetAssetRequest {
    /// A `data:` URI.
    pub image: String,
}

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitAccepted {
    pub operation_id: u64,
}

/// Response for `POST /session/stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// Whether an operation was actually stopped.
    pub stopped: bool,
}

/// Response for `POST /session/upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub item_id: ItemId,
    pub session: SessionSnapshot,
}

fn snapshot(state: &AppState) -> SnapshotResponse {
    Ok(Json(DataResponse {
        data: state.session.snapshot(),
    }))
}

/// GET /api/v1/session
pub async fn get_snapshot(State(state): State<AppState>) -> SnapshotResponse {
    snapshot(&state)
}

/// POST /api/v1/session/submit
///
/// Validates the draft and starts the generate/edit call. Returns 202 with
/// the operation id, 409 while another call is in flight and 400 when the
/// draft is incomplete.
pub async fn submit(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmitAccepted>>)> {
    let pending = state.session.begin_submit()?;
    let operation_id = pending.operation_id();

    tokio::spawn(async move {
        let outcome = pending.run().await;
        tracing::debug!(operation_id, ?outcome, "Background submission settled");
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitAccepted { operation_id },
        }),
    ))
}

/// POST /api/v1/session/stop
pub async fn stop(State(state): State<AppState>) -> Json<DataResponse<StopResponse>> {
    let stopped = state.session.stop();
    Json(DataResponse {
        data: StopResponse { stopped },
    })
}

/// POST /api/v1/session/undo
pub async fn undo(State(state): State<AppState>) -> SnapshotResponse {
    state.session.undo();
    snapshot(&state)
}

/// POST /api/v1/session/redo
pub async fn redo(State(state): State<AppState>) -> SnapshotResponse {
    state.session.redo();
    snapshot(&state)
}

/// POST /api/v1/session/select
///
/// Out-of-range indices are rejected with 400 and leave the cursor alone.
pub async fn select(
    State(state): State<AppState>,
    Json(input): Json<SelectRequest>,
) -> SnapshotResponse {
    state.session.select_history_index(input.index)?;
    snapshot(&state)
}

/// POST /api/v1/session/reset
pub async fn reset(State(state): State<AppState>) -> SnapshotResponse {
    state.session.reset_to_new_model();
    snapshot(&state)
}

/// PUT /api/v1/session/prompt
pub async fn set_prompt(
    State(state): State<AppState>,
    Json(input): Json<PromptRequest>,
) -> SnapshotResponse {
    state.session.set_prompt(input.prompt);
    snapshot(&state)
}

/// PUT /api/v1/session/assets/{kind}/{key}
pub async fn set_asset(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
    Json(input): Json<SetAssetRequest>,
) -> SnapshotResponse {
    let (kind, key) = parse_slot(&kind, &key)?;
    let asset = ImageAsset::from_data_uri(input.image)?;
    state.session.set_asset(kind, key, asset);
    snapshot(&state)
}

/// DELETE /api/v1/session/assets/{kind}/{key}
pub async fn remove_asset(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
) -> SnapshotResponse {
    let (kind, key) = parse_slot(&kind, &key)?;
    state.session.remove_asset(kind, key);
    snapshot(&state)
}

/// POST /api/v1/session/assets/{kind}/{key}/upload
///
/// Accepts a multipart form with a required `file` field.
pub async fn upload_asset(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
    multipart: Multipart,
) -> SnapshotResponse {
    let (kind, key) = parse_slot(&kind, &key)?;
    let upload = read_file_field(multipart).await?;
    state.session.upload_asset(kind, key, upload).await?;
    snapshot(&state)
}

/// POST /api/v1/session/upload
///
/// Accepts a multipart form with a required `file` field and starts editing
/// it as a fresh history.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadResponse>>)> {
    let upload = read_file_field(multipart).await?;
    let item_id = state.session.upload_image(upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResponse {
                item_id,
                session: state.session.snapshot(),
            },
        }),
    ))
}

/// DELETE /api/v1/session/error
pub async fn clear_error(State(state): State<AppState>) -> StatusCode {
    state.session.clear_error();
    StatusCode::NO_CONTENT
}

/// GET /api/v1/session/current/download
///
/// Returns the selected image as an attachment named after its history id.
pub async fn download_current(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let item = state
        .session
        .current_item()
        .ok_or_else(|| AppError::NotFound("No image selected".into()))?;

    let bytes = item
        .image
        .decode_bytes()
        .map_err(|e| AppError::InternalError(format!("stored image {}: {e}", item.id)))?;

    let disposition = format!("attachment; filename=\"{}\"", item.download_file_name());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, item.image.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

fn parse_slot(kind: &str, key: &str) -> AppResult<(BagKind, AssetKey)> {
    Ok((kind.parse()?, key.parse()?))
}

/// Pull the `file` field out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> AppResult<RawUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok(RawUpload::new(file_name, bytes.to_vec()));
    }

    Err(AppError::BadRequest("Missing required 'file' field".into()))
}
