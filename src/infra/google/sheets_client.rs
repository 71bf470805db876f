use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::cards::{GatewayError, RangeUpdate, SheetsGateway};

use super::{error_from_response, transport};

/// Minimal Sheets v4 values client. All writes use the USER_ENTERED value
/// input option, matching what a user typing into the sheet would produce.
#[derive(Clone)]
pub struct SheetsApiClient {
    client: Client,
    base_url: String,
}

impl SheetsApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
        }
    }

    /// A1 ranges carry quotes and non-ASCII tab names, so they are encoded
    /// before landing in the URL path.
    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            self.base_url,
            spreadsheet_id,
            urlencoding::encode(range),
            suffix
        )
    }

    fn cell_to_string(cell: serde_json::Value) -> String {
        match cell {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        }
    }
}

impl Default for SheetsApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetsGateway for SheetsApiClient {
    async fn get_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GatewayError> {
        let response = self
            .client
            .get(self.values_url(spreadsheet_id, range, ""))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let payload: ApiValueRange = response.json().await.map_err(transport)?;
        Ok(payload
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(Self::cell_to_string).collect())
            .collect())
    }

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .put(self.values_url(spreadsheet_id, range, ""))
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.values_url(spreadsheet_id, range, ":append"))
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn clear_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.values_url(spreadsheet_id, range, ":clear"))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn batch_update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        updates: Vec<RangeUpdate>,
    ) -> Result<(), GatewayError> {
        let data: Vec<serde_json::Value> = updates
            .into_iter()
            .map(|update| json!({ "range": update.range, "values": update.values }))
            .collect();

        let response = self
            .client
            .post(format!(
                "{}/{}/values:batchUpdate",
                self.base_url, spreadsheet_id
            ))
            .bearer_auth(token)
            .json(&json!({
                "valueInputOption": "USER_ENTERED",
                "data": data,
            }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn add_sheet(
        &self,
        token: &str,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(format!("{}/{}:batchUpdate", self.base_url, spreadsheet_id))
            .bearer_auth(token)
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiValueRange {
    values: Option<Vec<Vec<serde_json::Value>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_payload_maps_to_string_rows() {
        let payload = r#"{
            "range": "'名刺管理データベース'!A2:E4",
            "majorDimension": "ROWS",
            "values": [
                ["山田太郎", "2024-05-01T09:30:00Z", "展示会", "yamada.jpg", "1abc"],
                ["数値セル", 42]
            ]
        }"#;
        let parsed: ApiValueRange = serde_json::from_str(payload).unwrap();
        let rows: Vec<Vec<String>> = parsed
            .values
            .unwrap()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(SheetsApiClient::cell_to_string)
                    .collect()
            })
            .collect();

        assert_eq!(rows[0][4], "1abc");
        // Non-string cells degrade to their JSON rendering.
        assert_eq!(rows[1][1], "42");
    }

    #[test]
    fn ranges_are_percent_encoded_in_the_path() {
        let client = SheetsApiClient::new();
        let url = client.values_url("sheet-1", "'名刺管理データベース'!A1:E1", ":clear");
        assert!(url.starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/"));
        assert!(!url.contains('\''));
        assert!(url.ends_with(":clear"));
    }
}
