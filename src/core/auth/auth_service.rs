use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::DashMap;

/// An authenticated caller. The access token rides along because Drive and
/// Sheets calls are made on the user's behalf.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, expired, or unrecognized access token.
    #[error("認証されていません。")]
    Unauthorized,
    #[error("token introspection failed: {0}")]
    Introspection(String),
}

/// What the identity provider says about an access token.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub user_id: String,
    pub email: Option<String>,
    /// Seconds until the token expires.
    pub expires_in: u64,
}

#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    async fn introspect(&self, token: &str) -> Result<TokenIdentity, AuthError>;
}

struct CachedIdentity {
    user_id: String,
    email: Option<String>,
    expires_at: SystemTime,
}

/// Resolves bearer tokens to sessions, caching each identity until shortly
/// before the token expires so repeated requests don't re-hit the provider.
pub struct AuthService<I: TokenIntrospector> {
    introspector: I,
    cache: DashMap<String, CachedIdentity>,
}

impl<I: TokenIntrospector> AuthService<I> {
    pub fn new(introspector: I) -> Self {
        Self {
            introspector,
            cache: DashMap::new(),
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        if let Some(cached) = self.cache.get(token) {
            if cached.expires_at > SystemTime::now() + Duration::from_secs(60) {
                return Ok(Session {
                    user_id: cached.user_id.clone(),
                    email: cached.email.clone(),
                    access_token: token.to_string(),
                });
            }
        }
        self.cache.remove(token);

        let identity = self.introspector.introspect(token).await?;
        let session = Session {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
            access_token: token.to_string(),
        };
        self.cache.insert(
            token.to_string(),
            CachedIdentity {
                user_id: identity.user_id,
                email: identity.email,
                expires_at: SystemTime::now() + Duration::from_secs(identity.expires_in),
            },
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIntrospector {
        calls: AtomicUsize,
        expires_in: u64,
        reject: bool,
    }

    #[async_trait]
    impl TokenIntrospector for CountingIntrospector {
        async fn introspect(&self, token: &str) -> Result<TokenIdentity, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(AuthError::Unauthorized);
            }
            Ok(TokenIdentity {
                user_id: format!("user-of-{}", token),
                email: Some("user@example.com".to_string()),
                expires_in: self.expires_in,
            })
        }
    }

    #[tokio::test]
    async fn resolve_caches_until_expiry() {
        let service = AuthService::new(CountingIntrospector {
            calls: AtomicUsize::new(0),
            expires_in: 3600,
            reject: false,
        });

        let first = service.resolve("tok-a").await.unwrap();
        let second = service.resolve("tok-a").await.unwrap();
        assert_eq!(first.user_id, "user-of-tok-a");
        assert_eq!(second.user_id, first.user_id);
        assert_eq!(service.introspector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nearly_expired_tokens_are_reintrospected() {
        let service = AuthService::new(CountingIntrospector {
            calls: AtomicUsize::new(0),
            // Inside the 60-second slack, so the cache entry is never reused.
            expires_in: 10,
            reject: false,
        });

        service.resolve("tok-a").await.unwrap();
        service.resolve("tok-a").await.unwrap();
        assert_eq!(service.introspector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejected_tokens_surface_unauthorized() {
        let service = AuthService::new(CountingIntrospector {
            calls: AtomicUsize::new(0),
            expires_in: 3600,
            reject: true,
        });

        let err = service.resolve("bad").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }
}
