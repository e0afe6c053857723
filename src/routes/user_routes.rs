//! Profile and favorites endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};

use crate::models::{AdminUser, Car, Envelope, FavoriteRequest, ProfileUpdate, User};
use crate::state::AppState;
use crate::utils::http_helpers::{ok, AppJson, AppPath, HTTPError};

/// Registers user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/me", put(update_profile))
        .route(
            "/api/users/me/favorites",
            get(list_favorites).post(add_favorite),
        )
        .route("/api/users/me/favorites/{car_id}", delete(remove_favorite))
}

/// The user's favorite cars. Ids of deleted cars are skipped.
async fn favorite_cars(state: &AppState, user: &User) -> Result<Vec<Car>, HTTPError> {
    let ids = state.store.favorite_ids(&user.id).await?;
    Ok(state.store.get_cars(&ids).await?)
}

async fn list_favorites(
    user: User,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<Vec<Car>>>), HTTPError> {
    Ok(ok(favorite_cars(&state, &user).await?))
}

async fn add_favorite(
    user: User,
    State(state): State<AppState>,
    AppJson(request): AppJson<FavoriteRequest>,
) -> Result<(StatusCode, Json<Envelope<Vec<Car>>>), HTTPError> {
    if state.store.get_car(&request.car_id).await?.is_none() {
        return Err(HTTPError::not_found("Car not found"));
    }
    state.store.add_favorite(&user.id, &request.car_id).await?;
    Ok(ok(favorite_cars(&state, &user).await?))
}

async fn remove_favorite(
    user: User,
    State(state): State<AppState>,
    AppPath(car_id): AppPath<String>,
) -> Result<(StatusCode, Json<Envelope<Vec<Car>>>), HTTPError> {
    state.store.remove_favorite(&user.id, &car_id).await?;
    Ok(ok(favorite_cars(&state, &user).await?))
}

async fn update_profile(
    user: User,
    State(state): State<AppState>,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<(StatusCode, Json<Envelope<User>>), HTTPError> {
    if update
        .name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(HTTPError::bad_request("Name is required"));
    }
    let updated = state.store.update_user(&user.id, &update).await?;
    Ok(ok(updated))
}

async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<Vec<User>>>), HTTPError> {
    Ok(ok(state.store.list_users().await?))
}
