use async_trait::async_trait;

use super::card_models::{DriveFile, GatewayError};

/// One range write inside a values batchUpdate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeUpdate {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// Drive operations the card workflow needs. Calls are authenticated with the
/// requesting user's OAuth access token; the gateway itself holds no
/// credentials.
#[async_trait]
pub trait DriveGateway: Send + Sync {
    /// Lists JPEG/PNG images in a folder, excluding trashed files. The page
    /// size bounds how many files a single call can see; `newest_first`
    /// orders by Drive's modifiedTime descending.
    async fn list_images(
        &self,
        token: &str,
        folder_id: &str,
        page_size: u32,
        newest_first: bool,
    ) -> Result<Vec<DriveFile>, GatewayError>;

    async fn file_metadata(&self, token: &str, file_id: &str) -> Result<DriveFile, GatewayError>;

    async fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, GatewayError>;

    async fn rename(&self, token: &str, file_id: &str, new_name: &str)
        -> Result<(), GatewayError>;

    /// Moves a file to the trash. Drive reports a permission problem as 403,
    /// which callers surface as-is.
    async fn trash(&self, token: &str, file_id: &str) -> Result<(), GatewayError>;

    async fn upload(
        &self,
        token: &str,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DriveFile, GatewayError>;
}

/// Sheets values operations. Ranges use A1 notation with the tab name quoted
/// by the caller; all writes use the USER_ENTERED value input option.
#[async_trait]
pub trait SheetsGateway: Send + Sync {
    async fn get_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GatewayError>;

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), GatewayError>;

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), GatewayError>;

    async fn clear_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), GatewayError>;

    async fn batch_update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        updates: Vec<RangeUpdate>,
    ) -> Result<(), GatewayError>;

    async fn add_sheet(
        &self,
        token: &str,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<(), GatewayError>;
}

/// Single-shot text detection. Returns the first annotation's full text, or
/// `None` when the image yielded no text at all.
#[async_trait]
pub trait OcrGateway: Send + Sync {
    async fn detect_text(&self, image: &[u8]) -> Result<Option<String>, GatewayError>;
}
