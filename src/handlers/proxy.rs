use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware,
    routing::on,
    Extension, Router,
};

use crate::auth::Session;
use crate::middleware::require_session;
use crate::proxy::PROXY_ROUTES;
use crate::state::AppState;

/// One axum route per entry in the proxy table, all behind the access guard
pub fn routes(state: AppState) -> Router<AppState> {
    let mut router = Router::new();

    for route in PROXY_ROUTES {
        router = router.route(
            route.path,
            on(
                route.method_filter(),
                move |State(state): State<AppState>,
                      Extension(session): Extension<Session>,
                      params: Option<Path<HashMap<String, String>>>,
                      request: Request| async move {
                    let params = params.map(|Path(params)| params).unwrap_or_default();
                    state.gateway.relay(&session, route, params, request).await
                },
            ),
        );
    }

    router.route_layer(middleware::from_fn_with_state(state, require_session))
}
