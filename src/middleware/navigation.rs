//! Route middleware for browser page navigations.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::state::AppState;

/// Path prefixes (after the leading `/`) that are never guarded
const EXCLUDED_PREFIXES: &[&str] = &[
    "auth",
    "api",
    "_next/static",
    "_next/image",
    "favicon.ico",
    "sitemap.xml",
    "robots.txt",
    "register",
    "health",
];

pub const LOGIN_PATH: &str = "/auth/login";

/// Whether a navigation to `path` needs a session. The root page is public;
/// exclusions match as prefixes, so `/api` also covers `/api/proxy/...`.
pub fn is_protected_path(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.is_empty() {
        return false;
    }
    !EXCLUDED_PREFIXES.iter().any(|prefix| rest.starts_with(prefix))
}

/// `/auth/login?returnTo=<path+query>`
pub fn login_redirect(path_and_query: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("returnTo", path_and_query)
        .finish();
    format!("{}?{}", LOGIN_PATH, query)
}

pub async fn navigation_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let uri = request.uri();
    if !is_protected_path(uri.path()) {
        return next.run(request).await;
    }

    let signed_in = state
        .sessions
        .get_session(request.headers())
        .await
        .is_some_and(|session| session.is_authenticated());

    if signed_in {
        return next.run(request).await;
    }

    let return_to = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    tracing::debug!(path = uri.path(), "Redirecting signed-out navigation to login");
    Redirect::temporary(&login_redirect(return_to)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_and_excluded_paths_are_public() {
        for path in [
            "/",
            "/auth/login",
            "/api/proxy/appointments",
            "/_next/static/chunks/main.js",
            "/_next/image",
            "/favicon.ico",
            "/robots.txt",
            "/sitemap.xml",
            "/register",
            "/health",
        ] {
            assert!(!is_protected_path(path), "{} should be public", path);
        }
    }

    #[test]
    fn pages_are_protected() {
        for path in ["/appointments", "/admin/users", "/profile/schedule", "/_next/data/x.json"] {
            assert!(is_protected_path(path), "{} should be protected", path);
        }
    }

    #[test]
    fn login_redirect_keeps_path_and_query() {
        let location = login_redirect("/appointments?status=PENDING&page=2");
        let url = url::Url::parse(&format!("http://gateway{}", location)).unwrap();
        assert_eq!(url.path(), "/auth/login");
        let return_to: Vec<_> = url.query_pairs().filter(|(k, _)| k == "returnTo").map(|(_, v)| v.into_owned()).collect();
        assert_eq!(return_to, vec!["/appointments?status=PENDING&page=2".to_string()]);
    }
}
