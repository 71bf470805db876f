pub mod card_models;
pub mod gateways;
pub mod sync_service;

pub use card_models::{
    file_error_text, heic_skip_text, CardRow, DriveFile, GatewayError, UpstreamError, HEADER,
    OCR_EMPTY_TEXT, SHEET_NAME,
};
pub use gateways::{DriveGateway, OcrGateway, RangeUpdate, SheetsGateway};
pub use sync_service::{DeleteOutcome, ResyncSummary, SyncError, SyncService, RESYNC_PAGE_SIZE};
