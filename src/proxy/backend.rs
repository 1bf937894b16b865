use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use url::Url;

use crate::auth::AccessToken;
use crate::config::BackendConfig;
use crate::error::ApiError;

/// Outbound call as built by the forward stage
#[derive(Debug)]
pub struct Outbound {
    pub method: Method,
    pub url: Url,
    pub body: Option<Bytes>,
}

/// Backend reply, relayed to the browser without re-encoding
#[derive(Debug)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for BackendResponse {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        (self.status, [(header::CONTENT_TYPE, content_type)], Body::from(self.body)).into_response()
    }
}

/// HTTP client for the booking backend. reqwest keeps no response cache, so
/// every call reaches the backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Option<String>,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            base_url: config.url.clone(),
            http: builder.build()?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    /// Validated on every request so a missing setting never stops the server
    pub fn base_url(&self) -> Result<Url, ApiError> {
        let raw = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ApiError::BackendNotConfigured)?;
        Url::parse(raw).map_err(|e| ApiError::bad_gateway(format!("BACKEND_URL is invalid: {}", e)))
    }

    pub async fn send(&self, outbound: Outbound, token: &AccessToken) -> Result<BackendResponse, ApiError> {
        let mut request = self
            .http
            .request(outbound.method, outbound.url)
            .bearer_auth(token.secret());

        if let Some(body) = outbound.body {
            request = request.header(header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }
}
