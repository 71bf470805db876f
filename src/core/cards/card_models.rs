use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sheet tab all card data lives in.
pub const SHEET_NAME: &str = "名刺管理データベース";

/// Fixed header row. Column order is part of the spreadsheet contract:
/// OCR text, last-updated timestamp, memo, display filename, Drive file id.
pub const HEADER: [&str; 5] = ["名刺情報", "更新日", "メモ", "ファイル名", "File ID"];

pub const COL_TEXT_INFO: usize = 0;
pub const COL_UPDATED_AT: usize = 1;
pub const COL_MEMO: usize = 2;
pub const COL_FILE_NAME: usize = 3;
pub const COL_FILE_ID: usize = 4;

/// Written when Vision returns no text annotation at all.
pub const OCR_EMPTY_TEXT: &str = "OCRでテキスト抽出不可";

/// Row text for a HEIC file we refuse to send to Vision.
pub fn heic_skip_text(file_name: &str) -> String {
    format!("HEICファイルは処理対象外です ({})", file_name)
}

/// Row text for a file whose download or OCR failed. The failure is recorded
/// in the row instead of aborting the batch.
pub fn file_error_text(file_name: &str, message: &str) -> String {
    format!("ファイル処理エラー ({}): {}", file_name, message)
}

/// A file in the user's Drive folder. Fetched fresh per request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
}

impl DriveFile {
    /// HEIC images slip through folder listings when their MIME type is
    /// mislabeled, so the name is checked too.
    pub fn is_heic(&self) -> bool {
        self.name.to_lowercase().ends_with(".heic")
            || self.mime_type.to_lowercase().contains("heic")
    }
}

/// One data row of the card sheet, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRow {
    pub text_info: String,
    pub updated_at: String,
    pub memo: String,
    pub file_name: String,
    pub file_id: String,
}

impl CardRow {
    pub fn into_cells(self) -> Vec<String> {
        vec![
            self.text_info,
            self.updated_at,
            self.memo,
            self.file_name,
            self.file_id,
        ]
    }

    /// Reads a row back from sheet cells. Short rows are padded with empty
    /// strings; the Sheets API drops trailing empty cells.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
        Self {
            text_info: cell(COL_TEXT_INFO),
            updated_at: cell(COL_UPDATED_AT),
            memo: cell(COL_MEMO),
            file_name: cell(COL_FILE_NAME),
            file_id: cell(COL_FILE_ID),
        }
    }
}

/// An error reported by a Google API, with the provider's own message pulled
/// out of the nested error payload when it was present.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub status: u16,
    pub message: Option<String>,
}

impl UpstreamError {
    /// Human-readable description: the provider message when available,
    /// otherwise a generic fallback.
    pub fn describe(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!("Google APIの呼び出しに失敗しました。(HTTP {})", self.status),
        }
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Errors raised by the Drive/Sheets/OCR gateways.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Upstream(UpstreamError),
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GatewayError::Upstream(err) => Some(err.status),
            GatewayError::Transport(_) => None,
        }
    }

    /// A Sheets values read against a tab that does not exist fails with a
    /// 400 range-parse error. The synchronizer creates the tab in response.
    pub fn is_range_parse_failure(&self) -> bool {
        match self {
            GatewayError::Upstream(err) => {
                err.status == 400
                    && err
                        .message
                        .as_deref()
                        .map(|m| m.contains("Unable to parse range"))
                        .unwrap_or(false)
            }
            GatewayError::Transport(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heic_detected_by_name_or_mime() {
        let by_name = DriveFile {
            id: "f1".into(),
            name: "Scan.HEIC".into(),
            mime_type: "image/jpeg".into(),
            web_view_link: None,
            modified_time: None,
            thumbnail_link: None,
        };
        assert!(by_name.is_heic());

        let by_mime = DriveFile {
            id: "f2".into(),
            name: "scan.jpg".into(),
            mime_type: "image/heic".into(),
            web_view_link: None,
            modified_time: None,
            thumbnail_link: None,
        };
        assert!(by_mime.is_heic());

        let jpeg = DriveFile {
            id: "f3".into(),
            name: "card.jpg".into(),
            mime_type: "image/jpeg".into(),
            web_view_link: None,
            modified_time: None,
            thumbnail_link: None,
        };
        assert!(!jpeg.is_heic());
    }

    #[test]
    fn card_row_round_trips_through_cells() {
        let row = CardRow {
            text_info: "山田太郎 株式会社Acme".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
            memo: "展示会で交換".into(),
            file_name: "yamada.jpg".into(),
            file_id: "abc123".into(),
        };
        assert_eq!(CardRow::from_cells(&row.clone().into_cells()), row);
    }

    #[test]
    fn short_rows_are_padded() {
        let row = CardRow::from_cells(&["text".to_string(), "2024-01-01".to_string()]);
        assert_eq!(row.text_info, "text");
        assert_eq!(row.memo, "");
        assert_eq!(row.file_id, "");
    }

    #[test]
    fn upstream_describe_prefers_provider_message() {
        let with_message = UpstreamError {
            status: 403,
            message: Some("The user does not have sufficient permissions".into()),
        };
        assert_eq!(
            with_message.describe(),
            "The user does not have sufficient permissions"
        );

        let without = UpstreamError {
            status: 500,
            message: None,
        };
        assert!(without.describe().contains("500"));
    }

    #[test]
    fn range_parse_failure_is_recognized() {
        let missing_tab = GatewayError::Upstream(UpstreamError {
            status: 400,
            message: Some("Unable to parse range: '名刺管理データベース'!A1:E1".into()),
        });
        assert!(missing_tab.is_range_parse_failure());

        let other = GatewayError::Upstream(UpstreamError {
            status: 400,
            message: Some("Invalid value".into()),
        });
        assert!(!other.is_range_parse_failure());
    }
}
