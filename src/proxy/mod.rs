pub mod backend;
pub mod pipeline;
pub mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};

pub use backend::{BackendClient, BackendResponse, Outbound};
pub use routes::{ProxyMethod, ProxyRoute, PROXY_ROUTES};

use crate::auth::{Session, SessionProvider};
use crate::config::AppConfig;
use crate::error::ApiError;

/// Forwards authenticated requests to the booking backend.
///
/// One instance serves every route in [`PROXY_ROUTES`]; the route decides the
/// backend path, the request decides everything else.
pub struct Gateway {
    sessions: Arc<dyn SessionProvider>,
    backend: BackendClient,
    max_body: usize,
}

impl Gateway {
    pub fn new(sessions: Arc<dyn SessionProvider>, backend: BackendClient, max_body: usize) -> Self {
        Self {
            sessions,
            backend,
            max_body,
        }
    }

    pub fn from_config(config: &AppConfig, sessions: Arc<dyn SessionProvider>) -> Result<Self, reqwest::Error> {
        let backend = BackendClient::from_config(&config.backend)?;
        Ok(Self::new(sessions, backend, config.backend.max_request_size_bytes))
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Run the request through token acquisition and the backend call. Every
    /// outcome, including failures, becomes a response.
    pub async fn relay(
        &self,
        session: &Session,
        route: &'static ProxyRoute,
        params: HashMap<String, String>,
        request: Request,
    ) -> Response {
        let method = request.method().clone();
        match self.forward(session, route, &params, request).await {
            Ok(response) => {
                tracing::debug!(%method, route = route.path, status = %response.status, "Relayed backend response");
                response.into_response()
            }
            Err(err) => {
                tracing::error!(
                    %method,
                    route = route.path,
                    status = err.status_code().as_u16(),
                    error = %err,
                    "Proxy request failed"
                );
                err.into_response()
            }
        }
    }

    async fn forward(
        &self,
        session: &Session,
        route: &'static ProxyRoute,
        params: &HashMap<String, String>,
        request: Request,
    ) -> Result<BackendResponse, ApiError> {
        let token = pipeline::acquire_token(self.sessions.as_ref(), session).await?;

        let base = self.backend.base_url()?;
        let url = route.backend_url(&base, params, request.uri().query())?;
        let method = request.method().clone();
        let body = pipeline::read_body(request, self.max_body, &method).await?;

        self.backend.send(Outbound { method, url, body }, &token).await
    }
}
