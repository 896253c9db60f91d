use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use school_types::{LoginRequest, RefreshRequest, RefreshedAccess, RegisterRequest, TokenPair};
use serde_json::json;

use crate::error::StubError;
use crate::state::StubState;

/// Username of the bearer, inserted into request extensions by
/// [`require_bearer`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub String);

pub fn auth_routes() -> Router<StubState> {
    Router::new()
        .route("/api/auth/token/", post(handle_token))
        .route("/api/auth/token/refresh/", post(handle_refresh))
        .route("/api/auth/register/", post(handle_register))
}

async fn handle_token(
    State(state): State<StubState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, StubError> {
    let mut data = state.lock();
    let isValid = data
        .users
        .get(&body.username)
        .is_some_and(|user| user.password == body.password);
    if !isValid {
        return Err(StubError::InvalidCredentials);
    }

    let access = data.issue_access(&body.username);
    let refresh = data.issue_refresh(&body.username);
    tracing::info!("issued tokens for {}", body.username);

    Ok(Json(TokenPair { access, refresh }))
}

async fn handle_refresh(
    State(state): State<StubState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshedAccess>, StubError> {
    let mut data = state.lock();
    let username = data
        .refresh_tokens
        .get(&body.refresh)
        .cloned()
        .ok_or(StubError::Unauthorized)?;

    let access = data.issue_access(&username);
    Ok(Json(RefreshedAccess {
        access,
        refresh: None,
    }))
}

async fn handle_register(
    State(state): State<StubState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, StubError> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(StubError::BadRequest(
            "username and password are required".into(),
        ));
    }

    let mut data = state.lock();
    if data.users.contains_key(&body.username) {
        return Err(StubError::BadRequest("username already exists".into()));
    }

    data.create_user(&body.username, &body.password, &body.email, "student", None);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "username": body.username, "email": body.email })),
    )
        .into_response())
}

/// Middleware for resource routes: checks Authorization: Bearer <token> header.
pub async fn require_bearer(
    State(state): State<StubState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let username = bearer.and_then(|token| state.lock().access_tokens.get(&token).cloned());

    match username {
        Some(username) => {
            request.extensions_mut().insert(CurrentUser(username));
            next.run(request).await
        }
        None => StubError::Unauthorized.into_response(),
    }
}

/// Counts requests per path so tests can assert how often an endpoint was hit.
pub async fn record_hit(
    State(state): State<StubState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    *state.lock().hits.entry(path).or_insert(0) += 1;
    next.run(request).await
}
