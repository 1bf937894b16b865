//! Session model and the identity-provider seam.
//!
//! Handlers never talk to the identity provider directly: they receive an
//! `Arc<dyn SessionProvider>` so tests can swap in a fake.

pub mod auth0;
pub mod cookie;
pub mod store;
pub mod transaction;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{http::HeaderMap, http::StatusCode, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use auth0::Auth0Client;

/// Access tokens this close to expiry are refreshed instead of forwarded
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// The signed-in principal as read from the ID token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SessionUser {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            email: None,
            picture: None,
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("ADMIN")
    }
}

/// Bearer credential for the backend. Never logged: `Debug` is redacted and
/// there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Tokens held for a session by the provider's store
#[derive(Clone, Default)]
pub struct TokenSet {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// Usable access token, or `None` when missing or about to expire
    pub fn fresh_access_token(&self, now: DateTime<Utc>) -> Option<&AccessToken> {
        let token = self.access_token.as_ref()?;
        match self.expires_at {
            Some(expires_at) if expires_at <= now + Duration::seconds(EXPIRY_LEEWAY_SECS) => None,
            _ => Some(token),
        }
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Request-scoped view of the current principal. Read-only.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: SessionUser,
    pub(crate) id: Option<Uuid>,
    pub(crate) tokens: TokenSet,
}

impl Session {
    pub fn new(user: SessionUser) -> Self {
        Self {
            user,
            id: None,
            tokens: TokenSet::default(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.user.sub.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("The access token has expired and a refresh token was not provided. The user needs to re-authenticate.")]
    LoginRequired,

    #[error("The access token could not be refreshed: {0}")]
    Rejected(String),

    #[error("Identity provider unreachable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

impl TokenError {
    /// 401 when the user has to sign in again, 502 when the provider failed
    pub fn status_code(&self) -> StatusCode {
        match self {
            TokenError::LoginRequired | TokenError::Rejected(_) => StatusCode::UNAUTHORIZED,
            TokenError::ProviderUnavailable(_) | TokenError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Identity provider as seen by the gateway
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    /// Resolve the session for an incoming request, `None` when signed out
    async fn get_session(&self, headers: &HeaderMap) -> Option<Session>;

    /// Bearer token for the backend audience. Not retried.
    async fn get_access_token(&self, session: &Session) -> Result<AccessToken, TokenError>;

    /// Login, callback, logout and profile endpoints, mounted under `/auth`
    fn auth_routes(self: Arc<Self>) -> Router;
}
