// =============================================================================
// VISION CLIENT - Cloud Vision text detection
// =============================================================================
//
// Single-shot TEXT_DETECTION over the `images:annotate` endpoint. Image bytes
// are base64-encoded into the request body; authentication uses the process's
// service account rather than the end user's token, so OCR works on folders
// the service account can't see (the bytes arrive pre-downloaded).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::cards::{GatewayError, OcrGateway, UpstreamError};

use super::{error_from_response, transport, ServiceAccountAuth};

/// OAuth2 scope the service account token is requested with.
pub const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";

#[derive(Clone)]
pub struct VisionOcrClient {
    client: Client,
    base_url: String,
    auth: ServiceAccountAuth,
}

impl VisionOcrClient {
    pub fn new(auth: ServiceAccountAuth) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://vision.googleapis.com/v1".to_string(),
            auth,
        }
    }
}

#[async_trait]
impl OcrGateway for VisionOcrClient {
    async fn detect_text(&self, image: &[u8]) -> Result<Option<String>, GatewayError> {
        let token = self.auth.get_access_token().await?;

        let body = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }],
            }]
        });

        let response = self
            .client
            .post(format!("{}/images:annotate", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let payload: ApiAnnotateResponse = response.json().await.map_err(transport)?;
        first_annotation(payload)
    }
}

/// The first annotation holds the full recognized text; the rest are
/// per-word boxes the card workflow doesn't use.
fn first_annotation(payload: ApiAnnotateResponse) -> Result<Option<String>, GatewayError> {
    let result = match payload.responses.into_iter().next() {
        Some(result) => result,
        None => return Ok(None),
    };

    if let Some(error) = result.error {
        return Err(GatewayError::Upstream(UpstreamError {
            status: 500,
            message: error.message,
        }));
    }

    Ok(result
        .text_annotations
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|annotation| annotation.description))
}

#[derive(Debug, Deserialize)]
struct ApiAnnotateResponse {
    #[serde(default)]
    responses: Vec<ApiAnnotateResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAnnotateResult {
    text_annotations: Option<Vec<ApiTextAnnotation>>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiTextAnnotation {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_text_comes_from_the_first_annotation() {
        let payload: ApiAnnotateResponse = serde_json::from_str(
            r#"{
                "responses": [{
                    "textAnnotations": [
                        { "description": "山田太郎\n株式会社Acme\n03-1234-5678" },
                        { "description": "山田太郎" }
                    ]
                }]
            }"#,
        )
        .unwrap();

        let text = first_annotation(payload).unwrap().unwrap();
        assert!(text.starts_with("山田太郎\n"));
    }

    #[test]
    fn empty_annotations_mean_no_text() {
        let payload: ApiAnnotateResponse =
            serde_json::from_str(r#"{ "responses": [{}] }"#).unwrap();
        assert_eq!(first_annotation(payload).unwrap(), None);

        let no_responses: ApiAnnotateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(first_annotation(no_responses).unwrap(), None);
    }

    #[test]
    fn per_image_errors_surface_as_upstream() {
        let payload: ApiAnnotateResponse = serde_json::from_str(
            r#"{
                "responses": [{
                    "error": { "code": 3, "message": "Bad image data." }
                }]
            }"#,
        )
        .unwrap();

        let err = first_annotation(payload).unwrap_err();
        match err {
            GatewayError::Upstream(upstream) => {
                assert_eq!(upstream.describe(), "Bad image data.")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
