// Google REST API clients.
// - `service_account.rs` exchanges service-account credentials for tokens.
// - `oauth_client.rs` resolves user access tokens to identities.
// - `drive_client.rs` / `sheets_client.rs` act on the user's behalf.
// - `vision_client.rs` runs text detection with the service account.

pub mod drive_client;
pub mod oauth_client;
pub mod service_account;
pub mod sheets_client;
pub mod vision_client;

pub use drive_client::DriveApiClient;
pub use oauth_client::GoogleTokenInfoClient;
pub use service_account::ServiceAccountAuth;
pub use sheets_client::SheetsApiClient;
pub use vision_client::VisionOcrClient;

use crate::core::cards::{GatewayError, UpstreamError};

/// Pulls the provider's message out of Google's nested error payload
/// (`{"error": {"code", "message", "status"}}`) when the body carries one.
pub(crate) fn upstream_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("error")?
                .get("message")?
                .as_str()
                .map(str::to_owned)
        });
    GatewayError::Upstream(UpstreamError { status, message })
}

/// Consumes a failed response into a typed upstream error.
pub(crate) async fn error_from_response(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    upstream_error(status, &body)
}

pub(crate) fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_extracts_nested_message() {
        let body = r#"{"error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}}"#;
        let err = upstream_error(403, body);
        match err {
            GatewayError::Upstream(upstream) => {
                assert_eq!(upstream.status, 403);
                assert_eq!(
                    upstream.describe(),
                    "The caller does not have permission"
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn non_json_bodies_fall_back_to_generic_description() {
        let err = upstream_error(500, "<html>Internal Server Error</html>");
        match err {
            GatewayError::Upstream(upstream) => {
                assert_eq!(upstream.message, None);
                assert!(upstream.describe().contains("500"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
