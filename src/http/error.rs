use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::auth::AuthError;
use crate::core::cards::{GatewayError, SyncError};
use crate::core::settings::SettingsError;

/// Every failure leaves the service as `{"error": "..."}` with a status code
/// following the original taxonomy: 401 auth, 400 configuration or bad
/// input, the provider's own status for permission problems, 500 otherwise.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "認証されていません。")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::Introspection(reason) = &err {
            tracing::error!("token introspection failed: {}", reason);
        }
        Self::unauthorized()
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::NotConfigured => Self::bad_request(err.to_string()),
            SettingsError::Store(reason) => {
                tracing::error!("settings store failure: {}", reason);
                Self::internal("データベースエラーが発生しました。")
            }
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        // Permission and expired-credential problems keep the provider's
        // status; everything else is a plain server error.
        let status = match err.upstream_status() {
            Some(401) => StatusCode::UNAUTHORIZED,
            Some(403) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Gateway(gateway) => gateway.into(),
            SyncError::ColumnMissing(_) => Self::bad_request(err.to_string()),
            SyncError::RowNotFound(_) | SyncError::EmptySheet => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cards::UpstreamError;

    #[test]
    fn forbidden_drive_errors_keep_their_status() {
        let err: ApiError = GatewayError::Upstream(UpstreamError {
            status: 403,
            message: Some("insufficient permissions".into()),
        })
        .into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "insufficient permissions");
    }

    #[test]
    fn other_upstream_errors_become_500() {
        let err: ApiError = GatewayError::Upstream(UpstreamError {
            status: 429,
            message: None,
        })
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_settings_are_a_client_error() {
        let err: ApiError = SettingsError::NotConfigured.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("設定されていません"));
    }
}
