use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;

use super::card_models::{
    file_error_text, heic_skip_text, CardRow, GatewayError, COL_FILE_ID, COL_FILE_NAME, COL_MEMO,
    COL_UPDATED_AT, HEADER, OCR_EMPTY_TEXT, SHEET_NAME,
};
use super::gateways::{DriveGateway, OcrGateway, RangeUpdate, SheetsGateway};
use crate::core::gallery::CardInfo;

/// How many files a single resync call will see. Folders with more images
/// than this are only partially synchronized per invocation.
pub const RESYNC_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("スプレッドシートに '{0}' 列が見つかりません。")]
    ColumnMissing(&'static str),
    #[error("スプレッドシート内に対象のFile ID ({0}) が見つかりませんでした。")]
    RowNotFound(String),
    #[error("スプレッドシート「名刺管理データベース」にデータが見つかりません。")]
    EmptySheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncSummary {
    pub processed: usize,
}

/// What a delete actually managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Drive file trashed and the matching sheet row blanked.
    RowBlanked,
    /// Drive file trashed but no sheet row carried its File ID.
    DriveOnly,
}

/// Reconciles a spreadsheet with the current contents of a Drive folder.
///
/// Files are processed strictly in sequence and a single file's failure is
/// recorded in its row rather than aborting the batch. Concurrent resyncs
/// against the same spreadsheet race with last-writer-wins semantics.
pub struct SyncService<D, S, O> {
    drive: D,
    sheets: S,
    ocr: O,
}

impl<D, S, O> SyncService<D, S, O>
where
    D: DriveGateway,
    S: SheetsGateway,
    O: OcrGateway,
{
    pub fn new(drive: D, sheets: S, ocr: O) -> Self {
        Self { drive, sheets, ocr }
    }

    fn range(a1: &str) -> String {
        format!("'{}'!{}", SHEET_NAME, a1)
    }

    /// Makes sure the card sheet exists and carries the expected header row.
    /// A matching header performs zero writes; a mismatched one is cleared
    /// and rewritten.
    pub async fn ensure_header(&self, token: &str, spreadsheet_id: &str) -> Result<(), SyncError> {
        let header_range = Self::range("A1:E1");
        match self
            .sheets
            .get_values(token, spreadsheet_id, &header_range)
            .await
        {
            Ok(rows) => {
                if let Some(existing) = rows.first() {
                    if existing.len() == HEADER.len()
                        && existing.iter().zip(HEADER.iter()).all(|(cell, want)| cell == want)
                    {
                        tracing::debug!("header row already exists and matches");
                        return Ok(());
                    }
                }
                tracing::info!("header row missing or mismatched, rewriting it");
                self.sheets
                    .clear_values(token, spreadsheet_id, &header_range)
                    .await?;
                self.write_header(token, spreadsheet_id).await
            }
            Err(err) if err.is_range_parse_failure() => {
                tracing::info!("sheet '{}' does not exist, creating it", SHEET_NAME);
                self.sheets
                    .add_sheet(token, spreadsheet_id, SHEET_NAME)
                    .await?;
                self.write_header(token, spreadsheet_id).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn write_header(&self, token: &str, spreadsheet_id: &str) -> Result<(), SyncError> {
        let header = vec![HEADER.iter().map(|cell| cell.to_string()).collect()];
        self.sheets
            .update_values(token, spreadsheet_id, &Self::range("A1"), header)
            .await?;
        Ok(())
    }

    /// Reads all data rows and returns `file id -> memo` for rows where both
    /// are non-empty. A missing sheet tab simply yields an empty map.
    pub async fn collect_existing_memos(
        &self,
        token: &str,
        spreadsheet_id: &str,
    ) -> Result<HashMap<String, String>, SyncError> {
        let rows = self.data_rows(token, spreadsheet_id).await?;
        let mut memos = HashMap::new();
        for cells in &rows {
            let row = CardRow::from_cells(cells);
            if !row.file_id.is_empty() && !row.memo.is_empty() {
                memos.insert(row.file_id, row.memo);
            }
        }
        Ok(memos)
    }

    /// Full folder-to-spreadsheet reconciliation. After it returns, the data
    /// rows mirror exactly the files the folder listing produced.
    pub async fn resync(
        &self,
        token: &str,
        folder_id: &str,
        spreadsheet_id: &str,
        keep_memos: bool,
    ) -> Result<ResyncSummary, SyncError> {
        // Header trouble is logged and the data sync still runs best-effort.
        if let Err(err) = self.ensure_header(token, spreadsheet_id).await {
            tracing::error!("error processing or writing header row: {}", err);
        }

        // Memos must be captured before any data row is destroyed.
        let existing_memos = if keep_memos {
            self.collect_existing_memos(token, spreadsheet_id).await?
        } else {
            HashMap::new()
        };

        self.sheets
            .clear_values(token, spreadsheet_id, &Self::range("A2:E"))
            .await?;

        let files = self
            .drive
            .list_images(token, folder_id, RESYNC_PAGE_SIZE, false)
            .await?;
        if files.is_empty() {
            tracing::info!("no JPEG/PNG image files found in Drive folder");
            return Ok(ResyncSummary { processed: 0 });
        }
        tracing::info!("found {} JPEG/PNG files to process", files.len());

        let mut rows = Vec::with_capacity(files.len());
        for file in &files {
            let text_info = if file.is_heic() {
                tracing::info!("skipping HEIC file: {}", file.name);
                heic_skip_text(&file.name)
            } else {
                match self.download_and_ocr(token, &file.id).await {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::error!(
                            "error processing file {} ({}): {}",
                            file.name,
                            file.id,
                            err
                        );
                        file_error_text(&file.name, &err.to_string())
                    }
                }
            };

            let memo = existing_memos.get(&file.id).cloned().unwrap_or_default();
            rows.push(CardRow {
                text_info,
                updated_at: Utc::now().to_rfc3339(),
                memo,
                file_name: file.name.clone(),
                file_id: file.id.clone(),
            });
        }

        let processed = rows.len();
        let values = rows.into_iter().map(CardRow::into_cells).collect();
        // One overwrite starting at row 2, so the final row count matches the
        // listing exactly.
        self.sheets
            .update_values(token, spreadsheet_id, &Self::range("A2"), values)
            .await?;
        tracing::info!("{} records written to the card sheet", processed);
        Ok(ResyncSummary { processed })
    }

    /// OCRs one file and appends its row. Appending means repeated calls for
    /// the same file id leave duplicate rows; de-duplication is the caller's
    /// responsibility.
    pub async fn process_one(
        &self,
        token: &str,
        spreadsheet_id: &str,
        file_id: &str,
        file_name: &str,
        memo: &str,
    ) -> Result<(), SyncError> {
        let text_info = match self.download_and_ocr(token, file_id).await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!("error processing file {} ({}): {}", file_name, file_id, err);
                file_error_text(file_name, &err.to_string())
            }
        };

        let row = CardRow {
            text_info,
            updated_at: Utc::now().to_rfc3339(),
            memo: memo.to_string(),
            file_name: file_name.to_string(),
            file_id: file_id.to_string(),
        };
        self.sheets
            .append_values(
                token,
                spreadsheet_id,
                &Self::range("A:E"),
                vec![row.into_cells()],
            )
            .await?;
        Ok(())
    }

    /// Updates the display filename and memo of one card. The Drive rename is
    /// best-effort and never blocks the sheet update; the two writes are not
    /// transactional.
    pub async fn update_row(
        &self,
        token: &str,
        spreadsheet_id: &str,
        file_id: &str,
        new_name: &str,
        new_memo: &str,
    ) -> Result<(), SyncError> {
        match self.drive.file_metadata(token, file_id).await {
            Ok(current) if current.name != new_name => {
                if let Err(err) = self.drive.rename(token, file_id, new_name).await {
                    tracing::warn!("could not update Drive file name for {}: {}", file_id, err);
                } else {
                    tracing::info!("Drive file name updated for {} to \"{}\"", file_id, new_name);
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("could not read Drive file name for {}: {}", file_id, err);
            }
        }

        let rows = self
            .sheets
            .get_values(token, spreadsheet_id, &Self::range("A:Z"))
            .await?;
        if rows.is_empty() {
            return Err(SyncError::EmptySheet);
        }

        let header = &rows[0];
        let file_id_col = find_column(header, HEADER[COL_FILE_ID])?;
        let file_name_col = find_column(header, HEADER[COL_FILE_NAME])?;
        let memo_col = find_column(header, HEADER[COL_MEMO])?;
        let updated_col = find_column(header, HEADER[COL_UPDATED_AT])?;

        let row_number = locate_row(&rows, file_id_col, file_id)
            .ok_or_else(|| SyncError::RowNotFound(file_id.to_string()))?;
        let current = &rows[row_number - 1];
        let cell = |col: usize| current.get(col).map(String::as_str).unwrap_or("");

        // Only cells that actually change go into the batch, plus the
        // timestamp cell which always does.
        let mut updates = Vec::new();
        if cell(file_name_col) != new_name {
            updates.push(RangeUpdate {
                range: cell_range(file_name_col, row_number),
                values: vec![vec![new_name.to_string()]],
            });
        }
        if cell(memo_col) != new_memo {
            updates.push(RangeUpdate {
                range: cell_range(memo_col, row_number),
                values: vec![vec![new_memo.to_string()]],
            });
        }
        updates.push(RangeUpdate {
            range: cell_range(updated_col, row_number),
            values: vec![vec![Utc::now().to_rfc3339()]],
        });

        self.sheets
            .batch_update_values(token, spreadsheet_id, updates)
            .await?;
        Ok(())
    }

    /// Trashes the Drive file, then blanks (not removes) the matching sheet
    /// row so the remaining rows keep their indices.
    pub async fn delete_row(
        &self,
        token: &str,
        spreadsheet_id: &str,
        file_id: &str,
    ) -> Result<DeleteOutcome, SyncError> {
        self.drive.trash(token, file_id).await?;

        let header_rows = self
            .sheets
            .get_values(token, spreadsheet_id, &Self::range("A1:Z1"))
            .await?;
        let header = header_rows.into_iter().next().unwrap_or_default();
        let file_id_col = find_column(&header, HEADER[COL_FILE_ID])?;

        let rows = self
            .sheets
            .get_values(token, spreadsheet_id, &Self::range("A:Z"))
            .await?;
        match locate_row(&rows, file_id_col, file_id) {
            None => Ok(DeleteOutcome::DriveOnly),
            Some(row_number) => {
                let blank = vec![vec![String::new(); header.len()]];
                let range = format!(
                    "'{}'!A{}:{}{}",
                    SHEET_NAME,
                    row_number,
                    column_letter(header.len() - 1),
                    row_number
                );
                self.sheets
                    .update_values(token, spreadsheet_id, &range, blank)
                    .await?;
                Ok(DeleteOutcome::RowBlanked)
            }
        }
    }

    /// Sheet-derived card info keyed by File ID, for the gallery join.
    /// Blanked rows have an empty File ID and drop out here.
    pub async fn card_info_map(
        &self,
        token: &str,
        spreadsheet_id: &str,
    ) -> Result<HashMap<String, CardInfo>, SyncError> {
        let rows = self.data_rows(token, spreadsheet_id).await?;
        let mut map = HashMap::new();
        for cells in &rows {
            let row = CardRow::from_cells(cells);
            if row.file_id.is_empty() {
                continue;
            }
            map.insert(
                row.file_id,
                CardInfo {
                    memo: row.memo,
                    sheet_modified_date: row.updated_at,
                },
            );
        }
        Ok(map)
    }

    async fn data_rows(
        &self,
        token: &str,
        spreadsheet_id: &str,
    ) -> Result<Vec<Vec<String>>, SyncError> {
        match self
            .sheets
            .get_values(token, spreadsheet_id, &Self::range("A2:E"))
            .await
        {
            Ok(rows) => Ok(rows),
            Err(err) if err.is_range_parse_failure() => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn download_and_ocr(&self, token: &str, file_id: &str) -> Result<String, GatewayError> {
        let bytes = self.drive.download(token, file_id).await?;
        let annotation = self.ocr.detect_text(&bytes).await?;
        Ok(match annotation {
            // The full text comes back with embedded newlines; the sheet
            // keeps each card on one line.
            Some(text) => text.replace('\n', " "),
            None => OCR_EMPTY_TEXT.to_string(),
        })
    }
}

fn find_column(header: &[String], name: &'static str) -> Result<usize, SyncError> {
    header
        .iter()
        .position(|cell| cell == name)
        .ok_or(SyncError::ColumnMissing(name))
}

/// 1-based sheet row number of the first data row carrying `file_id`.
fn locate_row(rows: &[Vec<String>], file_id_col: usize, file_id: &str) -> Option<usize> {
    rows.iter()
        .enumerate()
        .skip(1)
        .find(|(_, cells)| cells.get(file_id_col).map(String::as_str) == Some(file_id))
        .map(|(idx, _)| idx + 1)
}

fn column_letter(idx: usize) -> char {
    (b'A' + idx as u8) as char
}

fn cell_range(col: usize, row_number: usize) -> String {
    format!("'{}'!{}{}", SHEET_NAME, column_letter(col), row_number)
}
