use std::sync::Arc;

use crate::core::auth::AuthService;
use crate::core::cards::SyncService;
use crate::core::settings::SettingsService;
use crate::infra::google::{
    DriveApiClient, GoogleTokenInfoClient, SheetsApiClient, VisionOcrClient,
};
use crate::infra::settings::SqliteSettingsStore;

/// Everything the route handlers need, wired once in `main`. The Drive
/// client appears both inside the synchronizer and standalone for the
/// listing/image/upload routes.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService<GoogleTokenInfoClient>>,
    pub settings: Arc<SettingsService<SqliteSettingsStore>>,
    pub sync: Arc<SyncService<DriveApiClient, SheetsApiClient, VisionOcrClient>>,
    pub drive: DriveApiClient,
}
