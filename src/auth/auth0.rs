//! Auth0 client: authorization-code login with PKCE, server-side sessions and
//! refresh-token based access token renewal.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{http::HeaderMap, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use super::cookie::{extract_cookie, CookieConfig, SESSION_COOKIE, TRANSACTION_COOKIE};
use super::store::SessionStore;
use super::transaction::{safe_return_to, LoginTransaction};
use super::{AccessToken, Session, SessionProvider, SessionUser, TokenError, TokenSet};
use crate::config::{AppConfig, ConfigError};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenEndpointResponse {
    /// Providers may omit the refresh token on renewal; the old one stays valid then
    fn token_set(&self, previous_refresh: Option<&str>) -> TokenSet {
        TokenSet {
            access_token: Some(AccessToken::new(self.access_token.clone())),
            refresh_token: self
                .refresh_token
                .clone()
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Query or form parameters the provider sends back to `/auth/callback`
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Result of a completed login: where to send the browser and the cookies to set
#[derive(Debug)]
pub struct CompletedLogin {
    pub return_to: String,
    pub session_cookie: String,
    pub clear_transaction_cookie: String,
}

pub struct Auth0Client {
    issuer: Url,
    client_id: String,
    client_secret: String,
    secret: String,
    app_base_url: String,
    audience: Option<String>,
    scope: String,
    roles_claim: String,
    transaction_ttl_secs: u64,
    session_cookie: CookieConfig,
    transaction_cookie: CookieConfig,
    http: reqwest::Client,
    store: SessionStore,
}

impl Auth0Client {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let auth = &config.auth;
        let domain = auth.domain.as_deref().ok_or(ConfigError::Missing("AUTH0_DOMAIN"))?;
        let client_id = auth.client_id.clone().ok_or(ConfigError::Missing("AUTH0_CLIENT_ID"))?;
        let client_secret = auth
            .client_secret
            .clone()
            .ok_or(ConfigError::Missing("AUTH0_CLIENT_SECRET"))?;
        let secret = auth.secret.clone().ok_or(ConfigError::Missing("AUTH0_SECRET"))?;
        let app_base_url = auth.app_base_url.as_deref().ok_or(ConfigError::Missing("APP_BASE_URL"))?;

        let issuer = issuer_url(domain).map_err(|reason| ConfigError::Invalid {
            name: "AUTH0_DOMAIN",
            reason,
        })?;
        Url::parse(app_base_url).map_err(|e| ConfigError::Invalid {
            name: "APP_BASE_URL",
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder().build().map_err(|e| ConfigError::Invalid {
            name: "identity provider client",
            reason: e.to_string(),
        })?;

        let secure = config.security.require_https;

        Ok(Self {
            issuer,
            client_id,
            client_secret,
            secret,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
            audience: auth.audience.clone(),
            scope: with_offline_access(&auth.scope),
            roles_claim: auth.roles_claim.clone(),
            transaction_ttl_secs: auth.transaction_ttl_secs,
            session_cookie: CookieConfig::new(SESSION_COOKIE, secure, auth.session_ttl_secs),
            transaction_cookie: CookieConfig::new(TRANSACTION_COOKIE, secure, auth.transaction_ttl_secs),
            http,
            store: SessionStore::new(auth.session_ttl_secs),
        })
    }

    fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app_base_url)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.issuer.clone();
        url.set_path(path);
        url
    }

    fn authorize_url(&self, txn: &LoginTransaction) -> Url {
        let mut url = self.endpoint("/authorize");
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri())
                .append_pair("scope", &self.scope)
                .append_pair("state", &txn.state)
                .append_pair("code_challenge", &txn.code_challenge())
                .append_pair("code_challenge_method", "S256");
            if let Some(audience) = &self.audience {
                query.append_pair("audience", audience);
            }
        }
        url
    }

    fn logout_url(&self) -> Url {
        let mut url = self.endpoint("/v2/logout");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("returnTo", &self.app_base_url);
        url
    }

    /// Start a login: redirect target plus the transaction cookie to set
    pub fn begin_login(&self, return_to: Option<&str>) -> Result<(Url, String), ApiError> {
        let txn = LoginTransaction::new(return_to, self.transaction_ttl_secs);
        let sealed = txn.seal(&self.secret).map_err(|e| {
            tracing::error!("Failed to seal login transaction: {}", e);
            ApiError::internal_server_error("Failed to start login")
        })?;
        Ok((self.authorize_url(&txn), self.transaction_cookie.build_set_cookie(&sealed)))
    }

    /// Finish a login started by [`Auth0Client::begin_login`]
    pub async fn complete_login(
        &self,
        headers: &HeaderMap,
        params: CallbackParams,
    ) -> Result<CompletedLogin, ApiError> {
        if let Some(error) = params.error {
            tracing::warn!(error = %error, "Identity provider returned a login error");
            return Err(ApiError::unauthorized(params.error_description.unwrap_or(error)));
        }

        let sealed = extract_cookie(headers, TRANSACTION_COOKIE)
            .ok_or_else(|| ApiError::bad_request("Login transaction not found"))?;
        let txn = LoginTransaction::open(&sealed, &self.secret)
            .map_err(|_| ApiError::bad_request("Login transaction is invalid or expired"))?;

        if params.state.as_deref() != Some(txn.state.as_str()) {
            return Err(ApiError::bad_request("State mismatch"));
        }
        let code = params
            .code
            .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

        let redirect_uri = self.redirect_uri();
        let response = self
            .request_tokens(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code.as_str()),
                ("code_verifier", txn.code_verifier.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await?;

        let id_token = response
            .id_token
            .as_deref()
            .ok_or_else(|| ApiError::from(TokenError::InvalidResponse("missing id_token".into())))?;
        let user = self.user_from_id_token(id_token)?;
        let session_id = self.store.create(user.clone(), response.token_set(None)).await;

        tracing::info!(sub = %user.sub, "User signed in");

        Ok(CompletedLogin {
            return_to: safe_return_to(Some(&txn.return_to)),
            session_cookie: self.session_cookie.build_set_cookie(&session_id.to_string()),
            clear_transaction_cookie: self.transaction_cookie.build_delete_cookie(),
        })
    }

    /// Drop the server-side session; returns the provider logout URL and the cookie clearing header
    pub async fn end_session(&self, headers: &HeaderMap) -> (Url, String) {
        if let Some(id) = session_id(headers) {
            if self.store.remove(&id).await {
                tracing::info!("User signed out");
            }
        }
        (self.logout_url(), self.session_cookie.build_delete_cookie())
    }

    /// Claims come from the back-channel token response, so issuer and
    /// audience are checked and the TLS exchange stands in for the signature.
    fn user_from_id_token(&self, id_token: &str) -> Result<SessionUser, TokenError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<IdTokenClaims>(id_token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| TokenError::InvalidResponse(format!("id_token: {}", e)))?
            .claims;

        let roles = match claims.extra.get(&self.roles_claim) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(role)) => vec![role.clone()],
            _ => Vec::new(),
        };

        Ok(SessionUser {
            sub: claims.sub,
            name: claims.name.or(claims.nickname),
            email: claims.email,
            picture: claims.picture,
            roles,
        })
    }

    async fn request_tokens(&self, form: &[(&str, &str)]) -> Result<TokenEndpointResponse, TokenError> {
        let response = self
            .http
            .post(self.endpoint("/oauth/token"))
            .form(form)
            .send()
            .await
            .map_err(|e| TokenError::ProviderUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<OAuthErrorBody>().await {
                Ok(body) => body.error_description.unwrap_or(body.error),
                Err(_) => status.to_string(),
            };
            return Err(if status.is_server_error() {
                TokenError::ProviderUnavailable(detail)
            } else {
                TokenError::Rejected(detail)
            });
        }

        response
            .json::<TokenEndpointResponse>()
            .await
            .map_err(|e| TokenError::InvalidResponse(e.without_url().to_string()))
    }
}

#[async_trait]
impl SessionProvider for Auth0Client {
    async fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        let id = session_id(headers)?;
        self.store.get(&id).await
    }

    async fn get_access_token(&self, session: &Session) -> Result<AccessToken, TokenError> {
        if let Some(token) = session.tokens.fresh_access_token(Utc::now()) {
            return Ok(token.clone());
        }

        let refresh_token = session
            .tokens
            .refresh_token
            .as_deref()
            .ok_or(TokenError::LoginRequired)?;

        let response = self
            .request_tokens(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .await?;

        let tokens = response.token_set(Some(refresh_token));
        if let Some(id) = session.id {
            self.store.update_tokens(&id, tokens.clone()).await;
        }
        tracing::debug!(sub = %session.user.sub, "Access token refreshed");

        tokens
            .access_token
            .ok_or_else(|| TokenError::InvalidResponse("missing access_token".into()))
    }

    fn auth_routes(self: Arc<Self>) -> Router {
        crate::handlers::auth::routes(self)
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    extract_cookie(headers, SESSION_COOKIE).and_then(|value| Uuid::parse_str(&value).ok())
}

/// Bare domains get `https://`; explicit schemes are kept for local providers
fn issuer_url(domain: &str) -> Result<Url, String> {
    let raw = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };
    let mut url = Url::parse(&raw).map_err(|e| e.to_string())?;
    url.set_path("/");
    url.set_query(None);
    Ok(url)
}

fn with_offline_access(scope: &str) -> String {
    if scope.split_whitespace().any(|s| s == "offline_access") {
        scope.to_string()
    } else {
        format!("{} offline_access", scope.trim())
    }
}
