use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::Request,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderValue, Method,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::auth::{Auth0Client, SessionProvider};
use crate::config::{AppConfig, SecurityConfig};
use crate::error::ApiError;
use crate::handlers::{health, proxy};
use crate::middleware::navigation_guard;
use crate::proxy::Gateway;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let pages_dir = &state.config.server.pages_dir;
    let pages = ServeDir::new(pages_dir).fallback(ServeFile::new(pages_dir.join("index.html")));

    Router::new()
        // Public
        .route("/health", get(health::health))
        // Identity provider: login, callback, logout, profile
        .nest_service("/auth", state.sessions.clone().auth_routes())
        // Authenticated backend relay
        .merge(proxy::routes(state.clone()))
        // Presentation assets; unknown API paths never fall through to them
        .fallback(move |request: Request| fallback(pages.clone(), request))
        // Global middleware
        .layer(middleware::from_fn_with_state(state.clone(), navigation_guard))
        .layer(cors_layer(&state.config.security))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION, COOKIE]))
        .with_state(state)
}

async fn fallback(pages: ServeDir<ServeFile>, request: Request) -> Response {
    if is_api_path(request.uri().path()) {
        return ApiError::not_found("Not Found").into_response();
    }
    match pages.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let sessions: Arc<dyn SessionProvider> =
        Arc::new(Auth0Client::from_config(&config).context("identity provider configuration")?);
    let gateway = Gateway::from_config(&config, sessions.clone()).context("backend client")?;

    if crate::is_production!(config) && !config.security.require_https {
        tracing::warn!("Production without SECURITY_REQUIRE_HTTPS: session cookies are not marked Secure");
    }
    if !gateway.backend().is_configured() {
        tracing::warn!("BACKEND_URL is not configured; proxied requests will answer 502");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(
        environment = ?config.environment,
        pages_dir = %config.server.pages_dir.display(),
        "Starting booking gateway"
    );

    let state = AppState::new(config, sessions, gateway);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Booking gateway listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Booking gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
