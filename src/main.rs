// This is the entry point of the CardSync service.
//
// **Architecture Overview:**
// - `core/` = Business logic (provider-agnostic)
// - `infra/` = Implementations of core traits (Google REST clients, SQLite)
// - `http/` = HTTP-specific adapters (axum routes, session extraction)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Build the router and serve

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use crate::core::auth::AuthService;
use crate::core::cards::SyncService;
use crate::core::settings::SettingsService;
use crate::http::state::AppState;
use crate::infra::google::vision_client::VISION_SCOPE;
use crate::infra::google::{
    DriveApiClient, GoogleTokenInfoClient, ServiceAccountAuth, SheetsApiClient, VisionOcrClient,
};
use crate::infra::settings::SqliteSettingsStore;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let database_path =
        std::env::var("CARDSYNC_DB").unwrap_or_else(|_| "data/cardsync.db".to_string());
    let bind_addr = std::env::var("CARDSYNC_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let settings_store = SqliteSettingsStore::new(&database_path)
        .await
        .expect("Failed to initialize the settings database");
    let settings_service = Arc::new(SettingsService::new(settings_store));

    // Bearer tokens are resolved to Google identities and cached per token.
    let auth_service = Arc::new(AuthService::new(GoogleTokenInfoClient::new()));

    // Drive and Sheets act with the requesting user's token; Vision runs
    // under the process's service account.
    let drive = DriveApiClient::new();
    let sheets = SheetsApiClient::new();
    let vision_auth = ServiceAccountAuth::from_env(VISION_SCOPE).await.expect(
        "Missing service account credentials! Set GOOGLE_APPLICATION_CREDENTIALS or \
         GOOGLE_SERVICE_ACCOUNT_JSON.",
    );
    let vision = VisionOcrClient::new(vision_auth);
    let sync_service = Arc::new(SyncService::new(drive.clone(), sheets, vision));

    let state = AppState {
        auth: auth_service,
        settings: settings_service,
        sync: sync_service,
        drive,
    };

    // ========================================================================
    // HTTP SERVER SETUP
    // ========================================================================

    let app = http::routes::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind the listen address");
    tracing::info!("CardSync listening on {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Error running the HTTP server");
}
