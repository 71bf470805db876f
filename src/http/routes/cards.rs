use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::cards::sync_service::DeleteOutcome;
use crate::core::cards::DriveGateway;
use crate::core::gallery;
use crate::http::error::ApiError;
use crate::http::session::SessionUser;
use crate::http::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCardsRequest {
    #[serde(default)]
    pub keep_memos: bool,
}

/// POST /api/process-cards — full folder-to-spreadsheet resync.
pub async fn process_cards(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    body: Option<Json<ProcessCardsRequest>>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.require(&session.user_id).await?;
    let keep_memos = body.map(|Json(req)| req.keep_memos).unwrap_or(false);

    tracing::info!("card processing started for user {}", session.user_id);
    let summary = state
        .sync
        .resync(
            &session.access_token,
            &settings.drive_folder_id,
            &settings.spreadsheet_id,
            keep_memos,
        )
        .await?;

    let message = if summary.processed == 0 {
        "処理対象の新しいJPEG/PNG画像ファイルが見つかりませんでした。ヘッダー行は確認・作成されました。"
            .to_string()
    } else {
        format!(
            "{}件の名刺データが処理され、スプレッドシートに書き込まれました。",
            summary.processed
        )
    };
    Ok(Json(json!({
        "message": message,
        "processed": summary.processed,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSingleCardRequest {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub memo: String,
}

/// POST /api/process-single-card — OCR one uploaded card and append its row.
pub async fn process_single_card(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Json(req): Json<ProcessSingleCardRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.file_id.is_empty() || req.file_name.is_empty() {
        return Err(ApiError::bad_request(
            "ファイルIDまたはファイル名が不足しています。",
        ));
    }

    let settings = state.settings.require(&session.user_id).await?;
    state
        .sync
        .process_one(
            &session.access_token,
            &settings.spreadsheet_id,
            &req.file_id,
            &req.file_name,
            &req.memo,
        )
        .await?;

    Ok(Json(json!({
        "message": format!(
            "名刺「{}」の情報が処理され、スプレッドシートに書き込まれました。",
            req.file_name
        ),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardInfoRequest {
    pub file_id: Option<String>,
    pub new_name: Option<String>,
    pub new_memo: Option<String>,
}

/// POST /api/update-card-info — rename + memo edit for one card.
pub async fn update_card_info(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Json(req): Json<UpdateCardInfoRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(file_id), Some(new_name), Some(new_memo)) =
        (req.file_id, req.new_name, req.new_memo)
    else {
        return Err(ApiError::bad_request(
            "必要な情報（fileId, newName, newMemo）が不足しています。",
        ));
    };
    if file_id.is_empty() {
        return Err(ApiError::bad_request(
            "必要な情報（fileId, newName, newMemo）が不足しています。",
        ));
    }

    let settings = state.settings.require(&session.user_id).await?;
    state
        .sync
        .update_row(
            &session.access_token,
            &settings.spreadsheet_id,
            &file_id,
            &new_name,
            &new_memo,
        )
        .await?;

    Ok(Json(json!({ "message": "情報が正常に更新されました。" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCardRequest {
    #[serde(default)]
    pub file_id: String,
}

/// POST /api/delete-card — trash the Drive file and blank its sheet row.
pub async fn delete_card(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Json(req): Json<DeleteCardRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.file_id.is_empty() {
        return Err(ApiError::bad_request("ファイルIDが指定されていません。"));
    }

    let settings = state.settings.require(&session.user_id).await?;
    let outcome = state
        .sync
        .delete_row(&session.access_token, &settings.spreadsheet_id, &req.file_id)
        .await?;

    let message = match outcome {
        DeleteOutcome::RowBlanked => "名刺を削除しました。",
        DeleteOutcome::DriveOnly => {
            "スプレッドシートに該当するデータがないため、Driveのファイルのみ削除しました。"
        }
    };
    Ok(Json(json!({ "message": message })))
}

/// GET /api/get-sheet-memos — sheet-derived card info keyed by File ID, for
/// the gallery join.
pub async fn get_sheet_memos(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.require(&session.user_id).await?;
    let map = state
        .sync
        .card_info_map(&session.access_token, &settings.spreadsheet_id)
        .await?;
    Ok(Json(json!({ "cardInfoMap": map })))
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub search: String,
    pub page: Option<usize>,
}

/// GET /api/cards — the joined, sorted, paginated gallery. A fresh search
/// lands on page 1 unless the client asks for a specific page.
pub async fn gallery(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<gallery::GalleryPage>, ApiError> {
    let settings = state.settings.require(&session.user_id).await?;

    let files = state
        .drive
        .list_images(&session.access_token, &settings.drive_folder_id, 50, true)
        .await?;
    let info = state
        .sync
        .card_info_map(&session.access_token, &settings.spreadsheet_id)
        .await?;

    let items = gallery::build_gallery(files, &info);
    let filtered = gallery::filter_by_name(&items, &query.search);
    let page = gallery::paginate(filtered, query.page.unwrap_or(1));
    Ok(Json(page))
}
