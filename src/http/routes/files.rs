use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::core::cards::DriveGateway;
use crate::http::error::ApiError;
use crate::http::session::SessionUser;
use crate::http::state::AppState;

/// Listing page size for the gallery view. Larger than the resync bound so
/// the gallery shows cards a partial resync hasn't reached yet.
const LISTING_PAGE_SIZE: u32 = 50;

/// GET /api/get-drive-files — current folder listing, newest first.
pub async fn get_drive_files(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.require(&session.user_id).await?;
    let files = state
        .drive
        .list_images(
            &session.access_token,
            &settings.drive_folder_id,
            LISTING_PAGE_SIZE,
            true,
        )
        .await?;
    Ok(Json(json!({ "files": files })))
}

/// GET /api/get-image/{fileId} — streams the image bytes with the
/// Drive-reported MIME type and a short private cache lifetime.
pub async fn get_image(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    if file_id.is_empty() {
        return Err(ApiError::bad_request("ファイルIDが指定されていません。"));
    }

    let metadata = state
        .drive
        .file_metadata(&session.access_token, &file_id)
        .await?;
    let bytes = state
        .drive
        .download(&session.access_token, &file_id)
        .await?;

    let mime_type = if metadata.mime_type.is_empty() {
        "image/jpeg".to_string()
    } else {
        metadata.mime_type
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CACHE_CONTROL, "private, max-age=600".to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/upload-image-to-drive — multipart form with `file` and
/// `newFileName`, uploaded into the user's configured folder.
pub async fn upload_image(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.require(&session.user_id).await?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut mime_type = "application/octet-stream".to_string();
    let mut new_file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                if let Some(content_type) = field.content_type() {
                    mime_type = content_type.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                file_bytes = Some(bytes.to_vec());
            }
            Some("newFileName") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                new_file_name = Some(text);
            }
            _ => {}
        }
    }

    let (Some(bytes), Some(file_name)) = (file_bytes, new_file_name.filter(|n| !n.is_empty()))
    else {
        return Err(ApiError::bad_request(
            "ファイルまたはファイル名がありません。",
        ));
    };

    let uploaded = state
        .drive
        .upload(
            &session.access_token,
            &settings.drive_folder_id,
            &file_name,
            &mime_type,
            bytes,
        )
        .await?;
    tracing::info!("file uploaded to Drive: {} ({})", uploaded.name, uploaded.id);

    Ok(Json(json!({
        "message": "ファイルがGoogle Driveにアップロードされました。",
        "fileId": uploaded.id,
        "fileName": uploaded.name,
        "webViewLink": uploaded.web_view_link,
    })))
}
