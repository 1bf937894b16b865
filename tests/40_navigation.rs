mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{body_bytes, gateway_app, session_cookie, FakeSessions, MockBackend, Reply};
use tower::ServiceExt;
use url::Url;

fn return_to(location: &str) -> Result<Option<String>> {
    let url = Url::parse(&format!("http://gateway{}", location))?;
    assert_eq!(url.path(), "/auth/login");
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "returnTo")
        .map(|(_, value)| value.into_owned()))
}

#[tokio::test]
async fn signed_out_navigation_redirects_to_login_with_return_path() -> Result<()> {
    let backend = MockBackend::spawn(Reply::json(StatusCode::OK, "{}")).await?;
    let sessions = FakeSessions::signed_in();
    let app = gateway_app(Some(&backend.base_url), sessions.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/appointments?status=PENDING&page=2")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str()?;
    assert_eq!(return_to(location)?.as_deref(), Some("/appointments?status=PENDING&page=2"));

    assert_eq!(sessions.lookups(), 1);
    assert_eq!(sessions.token_calls(), 0);
    assert_eq!(backend.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn signed_in_navigation_passes_through() -> Result<()> {
    let sessions = FakeSessions::signed_in();
    let app = gateway_app(None, sessions.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/users")
                .header(header::COOKIE, session_cookie())
                .body(Body::empty())?,
        )
        .await?;

    // No pages are built in tests, so the asset fallback answers
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(sessions.lookups(), 1);
    Ok(())
}

#[tokio::test]
async fn excluded_paths_are_not_redirected() -> Result<()> {
    for path in ["/", "/register", "/favicon.ico", "/robots.txt", "/_next/static/app.js"] {
        let sessions = FakeSessions::signed_in();
        let response = gateway_app(None, sessions.clone())
            .oneshot(Request::builder().uri(path).body(Body::empty())?)
            .await?;

        assert_ne!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{}", path);
        assert_eq!(sessions.lookups(), 0, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn auth_routes_are_reachable_signed_out() -> Result<()> {
    let response = gateway_app(None, FakeSessions::signed_in())
        .oneshot(Request::builder().uri("/auth/login?returnTo=%2Fprofile").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await?[..], b"login page");
    Ok(())
}
