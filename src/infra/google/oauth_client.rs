use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::core::auth::{AuthError, TokenIdentity, TokenIntrospector};

/// Resolves a user's OAuth2 access token to their Google identity via the
/// tokeninfo endpoint. An unrecognized or expired token comes back as 400,
/// which maps to an unauthorized request here.
#[derive(Clone)]
pub struct GoogleTokenInfoClient {
    client: Client,
    base_url: String,
}

impl GoogleTokenInfoClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://oauth2.googleapis.com".to_string(),
        }
    }
}

impl Default for GoogleTokenInfoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ApiTokenInfo {
    sub: Option<String>,
    email: Option<String>,
    /// Seconds until expiry. The endpoint returns this as a string.
    expires_in: Option<String>,
}

fn identity_from(info: ApiTokenInfo) -> Result<TokenIdentity, AuthError> {
    let user_id = info.sub.ok_or(AuthError::Unauthorized)?;
    let expires_in = info
        .expires_in
        .as_deref()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(0);
    Ok(TokenIdentity {
        user_id,
        email: info.email,
        expires_in,
    })
}

#[async_trait]
impl TokenIntrospector for GoogleTokenInfoClient {
    async fn introspect(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        let response = self
            .client
            .get(format!("{}/tokeninfo", self.base_url))
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Introspection(e.to_string()))?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::Unauthorized),
            status if status.is_success() => {
                let info: ApiTokenInfo = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Introspection(e.to_string()))?;
                identity_from(info)
            }
            status => Err(AuthError::Introspection(format!(
                "tokeninfo returned {}",
                status
            ))),
        }
    }
}
