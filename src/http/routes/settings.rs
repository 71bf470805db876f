use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::session::SessionUser;
use crate::http::state::AppState;

/// GET /api/get-drive-settings — the user's saved folder/spreadsheet pair,
/// nulls when nothing has been configured yet.
pub async fn get_settings(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.get(&session.user_id).await?;
    match settings {
        Some(settings) => Ok(Json(json!({
            "folderId": settings.drive_folder_id,
            "spreadsheetId": settings.spreadsheet_id,
        }))),
        None => Ok(Json(json!({
            "folderId": Value::Null,
            "spreadsheetId": Value::Null,
        }))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    #[serde(default)]
    pub folder_id: String,
    #[serde(default)]
    pub spreadsheet_id: String,
}

/// POST /api/save-drive-settings — upsert-by-user-id.
pub async fn save_settings(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Json(req): Json<SaveSettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.folder_id.is_empty() || req.spreadsheet_id.is_empty() {
        return Err(ApiError::bad_request(
            "フォルダIDとスプレッドシートIDは必須です。",
        ));
    }

    let saved = state
        .settings
        .save(&session.user_id, &req.folder_id, &req.spreadsheet_id)
        .await?;

    Ok(Json(json!({
        "message": "設定が正常に保存されました。",
        "data": saved,
    })))
}
