// Route handlers, one module per resource group.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::state::AppState;

#[path = "cards.rs"]
pub mod cards;

#[path = "files.rs"]
pub mod files;

#[path = "settings.rs"]
pub mod settings;

/// Card images can be a few megabytes; the axum default limit is too tight
/// for the upload route.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/process-cards", post(cards::process_cards))
        .route("/api/process-single-card", post(cards::process_single_card))
        .route("/api/update-card-info", post(cards::update_card_info))
        .route("/api/delete-card", post(cards::delete_card))
        .route("/api/get-sheet-memos", get(cards::get_sheet_memos))
        .route("/api/cards", get(cards::gallery))
        .route("/api/get-drive-files", get(files::get_drive_files))
        .route("/api/get-image/:file_id", get(files::get_image))
        .route("/api/upload-image-to-drive", post(files::upload_image))
        .route("/api/get-drive-settings", get(settings::get_settings))
        .route("/api/save-drive-settings", post(settings::save_settings))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
