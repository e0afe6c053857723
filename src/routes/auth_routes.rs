//! Authentication endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::{AuthPayload, Envelope, LoginRequest, RegisterRequest, User};
use crate::state::AppState;
use crate::utils::http_helpers::{created, ok, AppJson, HTTPError};

/// Registers authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile))
}

/// Creates a customer account and returns a token for it.
async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthPayload>>), HTTPError> {
    let payload = state.auth.register(request).await?;
    Ok(created(payload))
}

/// Exchanges an email and password for a token.
async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthPayload>>), HTTPError> {
    let payload = state.auth.login(&request).await?;
    Ok(ok(payload))
}

/// Returns the account the bearer token belongs to.
async fn profile(user: User) -> (StatusCode, Json<Envelope<User>>) {
    ok(user)
}
