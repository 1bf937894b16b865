#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use booking_gateway::auth::cookie::{extract_cookie, SESSION_COOKIE};
use booking_gateway::auth::{AccessToken, Session, SessionProvider, SessionUser, TokenError};
use booking_gateway::config::AppConfig;
use booking_gateway::proxy::Gateway;
use booking_gateway::{app, AppState};
use tokio::net::TcpListener;

pub const VALID_SESSION: &str = "3f2b7c1e-0000-4000-8000-000000000001";
pub const PATIENT_TOKEN: &str = "patient-access-token";

/// Cookie header for a signed-in browser
pub fn session_cookie() -> String {
    format!("{}={}", SESSION_COOKIE, VALID_SESSION)
}

/// What the fake identity provider answers when asked for a token
#[derive(Debug, Clone, Copy)]
pub enum TokenBehavior {
    Token(&'static str),
    Empty,
    LoginRequired,
    ProviderDown,
}

pub struct FakeSessions {
    behavior: TokenBehavior,
    pub session_lookups: AtomicUsize,
    pub token_requests: AtomicUsize,
}

impl FakeSessions {
    pub fn new(behavior: TokenBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            session_lookups: AtomicUsize::new(0),
            token_requests: AtomicUsize::new(0),
        })
    }

    pub fn signed_in() -> Arc<Self> {
        Self::new(TokenBehavior::Token(PATIENT_TOKEN))
    }

    pub fn lookups(&self) -> usize {
        self.session_lookups.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for FakeSessions {
    async fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        self.session_lookups.fetch_add(1, Ordering::SeqCst);
        match extract_cookie(headers, SESSION_COOKIE) {
            Some(id) if id == VALID_SESSION => Some(Session::new(
                SessionUser::new("auth0|patient-1").with_roles(["PATIENT"]),
            )),
            _ => None,
        }
    }

    async fn get_access_token(&self, _session: &Session) -> Result<AccessToken, TokenError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            TokenBehavior::Token(token) => Ok(AccessToken::new(token)),
            TokenBehavior::Empty => Ok(AccessToken::new("")),
            TokenBehavior::LoginRequired => Err(TokenError::LoginRequired),
            TokenBehavior::ProviderDown => Err(TokenError::ProviderUnavailable("connection refused".into())),
        }
    }

    fn auth_routes(self: Arc<Self>) -> Router {
        Router::new().route("/login", get(|| async { "login page" }))
    }
}

/// Gateway router with an empty pages directory
pub fn gateway_app(backend_url: Option<&str>, sessions: Arc<FakeSessions>) -> Router {
    gateway_app_with_pages(
        backend_url,
        sessions,
        std::env::temp_dir().join("booking-gateway-tests-no-pages"),
    )
}

pub fn gateway_app_with_pages(backend_url: Option<&str>, sessions: Arc<FakeSessions>, pages_dir: PathBuf) -> Router {
    let mut config = AppConfig::development();
    config.backend.url = backend_url.map(str::to_string);
    config.server.pages_dir = pages_dir;

    let sessions: Arc<dyn SessionProvider> = sessions;
    let gateway = Gateway::from_config(&config, sessions.clone()).expect("backend client");
    app(AppState::new(config, sessions, gateway))
}

pub async fn body_bytes(response: Response) -> Result<Bytes> {
    Ok(to_bytes(response.into_body(), usize::MAX).await?)
}

pub async fn body_json(response: Response) -> Result<serde_json::Value> {
    let bytes = body_bytes(response).await?;
    serde_json::from_slice(&bytes).context("response body is not JSON")
}

/// Canned backend reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub body: &'static str,
}

impl Reply {
    pub fn json(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            content_type: Some("application/json; charset=utf-8"),
            body,
        }
    }

    /// No content-type header at all
    pub fn bare(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            content_type: None,
            body,
        }
    }
}

/// What the backend saw
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
struct MockState {
    reply: Reply,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Backend stand-in bound on an ephemeral local port
pub struct MockBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub async fn spawn(reply: Reply) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new().fallback(record).with_state(MockState {
            reply,
            requests: requests.clone(),
        });
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            requests,
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock backend lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("mock backend lock").len()
    }
}

async fn record(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let header_str = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: to_bytes(body, usize::MAX).await.unwrap_or_default(),
    };
    state.requests.lock().expect("mock backend lock").push(recorded);

    let mut response = Response::builder().status(state.reply.status);
    if let Some(content_type) = state.reply.content_type {
        response = response.header(header::CONTENT_TYPE, content_type);
    }
    response.body(Body::from(state.reply.body)).expect("mock response")
}

/// Fresh pages directory holding a single `index.html`
pub fn pages_with_index(html: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("booking-gateway-pages-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("index.html"), html)?;
    Ok(dir)
}

/// Address nothing listens on
pub async fn unreachable_backend() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}
