// HTTP boundary error type
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::TokenError;

pub const BACKEND_NOT_CONFIGURED: &str = "BACKEND_URL is not configured";

/// Every failure that reaches the browser. Each variant maps to exactly one
/// status code, and the body is always `{ "message": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("{0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("{0}")]
    Unauthorized(String),

    // 401 or 502, decided by the token provider
    #[error("{message}")]
    TokenAcquisition { status: StatusCode, message: String },

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 500 Internal Server Error
    #[error("{0}")]
    InternalServerError(String),

    // 502 Bad Gateway
    #[error("{}", BACKEND_NOT_CONFIGURED)]
    BackendNotConfigured,

    #[error("{0}")]
    BadGateway(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TokenAcquisition { status, .. } => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BackendNotConfigured => StatusCode::BAD_GATEWAY,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "message": self.to_string() })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::TokenAcquisition {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // The backend URL stays out of browser-visible messages
        let message = err.without_url().to_string();
        if message.is_empty() {
            ApiError::bad_gateway("Proxy error")
        } else {
            ApiError::BadGateway(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self.to_json())).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
