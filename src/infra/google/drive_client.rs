use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::core::cards::{DriveFile, DriveGateway, GatewayError};

use super::{error_from_response, transport};

const FILE_FIELDS: &str = "id, name, mimeType, webViewLink, modifiedTime, thumbnailLink";

/// Minimal Drive v3 client. It deliberately exposes only the calls the core
/// layer needs, authenticated per call with the requesting user's token.
#[derive(Clone)]
pub struct DriveApiClient {
    client: Client,
    base_url: String,
    upload_base_url: String,
}

impl DriveApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }

    fn parse_datetime(value: Option<String>) -> Option<DateTime<Utc>> {
        value
            .as_deref()
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn map_file(api: ApiDriveFile) -> Option<DriveFile> {
        // Files without an id or name are unusable downstream.
        let id = api.id?;
        let name = api.name?;
        Some(DriveFile {
            id,
            name,
            mime_type: api.mime_type.unwrap_or_default(),
            web_view_link: api.web_view_link,
            modified_time: Self::parse_datetime(api.modified_time),
            thumbnail_link: api.thumbnail_link,
        })
    }
}

impl Default for DriveApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveGateway for DriveApiClient {
    async fn list_images(
        &self,
        token: &str,
        folder_id: &str,
        page_size: u32,
        newest_first: bool,
    ) -> Result<Vec<DriveFile>, GatewayError> {
        let query = format!(
            "'{}' in parents and trashed = false and (mimeType='image/jpeg' or mimeType='image/png')",
            folder_id
        );
        let fields = format!("files({})", FILE_FIELDS);
        let page_size = page_size.to_string();

        let mut request = self
            .client
            .get(format!("{}/files", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", page_size.as_str()),
            ]);
        if newest_first {
            request = request.query(&[("orderBy", "modifiedTime desc")]);
        }

        let response = request.send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let listing: ApiFileList = response.json().await.map_err(transport)?;
        Ok(listing
            .files
            .unwrap_or_default()
            .into_iter()
            .filter_map(Self::map_file)
            .collect())
    }

    async fn file_metadata(&self, token: &str, file_id: &str) -> Result<DriveFile, GatewayError> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api: ApiDriveFile = response.json().await.map_err(transport)?;
        Self::map_file(api).ok_or_else(|| {
            GatewayError::Transport("Drive returned a file without id or name".to_string())
        })
    }

    async fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.bytes().await.map_err(transport)?.to_vec())
    }

    async fn rename(
        &self,
        token: &str,
        file_id: &str,
        new_name: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .patch(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": new_name }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn trash(&self, token: &str, file_id: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .patch(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(token)
            .json(&serde_json::json!({ "trashed": true }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn upload(
        &self,
        token: &str,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DriveFile, GatewayError> {
        // Drive's multipart upload wants multipart/related: one JSON metadata
        // part, one media part.
        const BOUNDARY: &str = "cardsync_upload_boundary";
        let metadata = serde_json::json!({
            "name": file_name,
            "parents": [folder_id],
        });

        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
                BOUNDARY, metadata
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!("--{}\r\nContent-Type: {}\r\n\r\n", BOUNDARY, mime_type).as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(format!("\r\n--{}--", BOUNDARY).as_bytes());

        let response = self
            .client
            .post(format!("{}/files", self.upload_base_url))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", BOUNDARY),
            )
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api: ApiDriveFile = response.json().await.map_err(transport)?;
        Self::map_file(api).ok_or_else(|| {
            GatewayError::Transport("Drive upload returned no file metadata".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiFileList {
    files: Option<Vec<ApiDriveFile>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDriveFile {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    web_view_link: Option<String>,
    modified_time: Option<String>,
    thumbnail_link: Option<String>,
}
