//! `/auth/*` endpoints served by the identity provider client.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Json, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::auth0::{Auth0Client, CallbackParams};
use crate::auth::{SessionProvider, SessionUser};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// `/auth/profile` body: the user without any token material
#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: SessionUser,
    pub is_admin: bool,
}

impl From<SessionUser> for Profile {
    fn from(user: SessionUser) -> Self {
        Self {
            is_admin: user.is_admin(),
            user,
        }
    }
}

/// Mounted under `/auth`
pub fn routes(client: Arc<Auth0Client>) -> Router {
    Router::new()
        .route("/login", get(login).post(login))
        .route("/callback", get(callback_query).post(callback_form))
        .route("/logout", get(logout).post(logout))
        .route("/profile", get(profile))
        .with_state(client)
}

async fn login(State(client): State<Arc<Auth0Client>>, Query(query): Query<LoginQuery>) -> Result<Response, ApiError> {
    let (authorize_url, txn_cookie) = client.begin_login(query.return_to.as_deref())?;
    Ok((AppendHeaders([(SET_COOKIE, txn_cookie)]), Redirect::to(authorize_url.as_str())).into_response())
}

async fn callback_query(
    State(client): State<Arc<Auth0Client>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    finish_login(&client, &headers, params).await
}

/// `response_mode=form_post`
async fn callback_form(
    State(client): State<Arc<Auth0Client>>,
    headers: HeaderMap,
    Form(params): Form<CallbackParams>,
) -> Result<Response, ApiError> {
    finish_login(&client, &headers, params).await
}

async fn finish_login(client: &Auth0Client, headers: &HeaderMap, params: CallbackParams) -> Result<Response, ApiError> {
    let login = client.complete_login(headers, params).await?;
    Ok((
        AppendHeaders([
            (SET_COOKIE, login.session_cookie),
            (SET_COOKIE, login.clear_transaction_cookie),
        ]),
        Redirect::to(&login.return_to),
    )
        .into_response())
}

async fn logout(State(client): State<Arc<Auth0Client>>, headers: HeaderMap) -> Response {
    let (logout_url, clear_cookie) = client.end_session(&headers).await;
    (AppendHeaders([(SET_COOKIE, clear_cookie)]), Redirect::to(logout_url.as_str())).into_response()
}

async fn profile(State(client): State<Arc<Auth0Client>>, headers: HeaderMap) -> Result<Response, ApiError> {
    let session = client
        .get_session(&headers)
        .await
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
    Ok(Json(Profile::from(session.user)).into_response())
}
