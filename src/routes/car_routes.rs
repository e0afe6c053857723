//! Car catalog endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::models::{AdminUser, Car, CarInput, CarQuery, Envelope};
use crate::state::AppState;
use crate::uploads::{PendingUpload, UploadError};
use crate::utils::http_helpers::{created, ok, AppJson, AppMultipart, AppPath, AppQuery, HTTPError};

/// Registers catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cars", get(list_cars).post(create_car))
        .route("/api/cars/brands", get(list_brands))
        .route(
            "/api/cars/{id}",
            get(get_car).put(update_car).delete(delete_car),
        )
        .route("/api/cars/{id}/images", post(upload_images))
}

async fn list_cars(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CarQuery>,
) -> Result<(StatusCode, Json<Envelope<Vec<Car>>>), HTTPError> {
    let cars = state.store.list_cars(&query).await?;
    Ok(ok(cars))
}

async fn list_brands(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<Vec<String>>>), HTTPError> {
    Ok(ok(state.store.brands().await?))
}

async fn get_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<(StatusCode, Json<Envelope<Car>>), HTTPError> {
    let car = state
        .store
        .get_car(&id)
        .await?
        .ok_or_else(|| HTTPError::not_found("Car not found"))?;
    Ok(ok(car))
}

async fn create_car(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CarInput>,
) -> Result<(StatusCode, Json<Envelope<Car>>), HTTPError> {
    input.validate().map_err(HTTPError::bad_request)?;
    let car = Car::from_input(input);
    state.store.insert_car(&car).await?;
    info!(
        event_name = "cars.created",
        event_domain = "cars",
        car_id = car.id.as_str(),
        admin_id = admin.id.as_str(),
        "car added to catalog"
    );
    Ok(created(car))
}

async fn update_car(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppJson(input): AppJson<CarInput>,
) -> Result<(StatusCode, Json<Envelope<Car>>), HTTPError> {
    input.validate().map_err(HTTPError::bad_request)?;
    // Applied in the store so a concurrent reservation is not overwritten.
    let car = state
        .store
        .update_car(&id, &input)
        .await?
        .ok_or_else(|| HTTPError::not_found("Car not found"))?;
    Ok(ok(car))
}

async fn delete_car(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<(StatusCode, Json<Envelope<()>>), HTTPError> {
    state.store.delete_car(&id).await?;
    info!(
        event_name = "cars.deleted",
        event_domain = "cars",
        car_id = id.as_str(),
        admin_id = admin.id.as_str(),
        "car removed from catalog"
    );
    Ok((
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data: None,
            message: Some("Car deleted".to_string()),
        }),
    ))
}

/// Accepts a multipart batch of photos. Every file is checked before any is
/// written, and nothing stays on disk if the batch cannot be attached.
async fn upload_images(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppMultipart(mut multipart): AppMultipart,
) -> Result<(StatusCode, Json<Envelope<Car>>), HTTPError> {
    if state.store.get_car(&id).await?.is_none() {
        return Err(HTTPError::not_found("Car not found"));
    }

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HTTPError::new(e.status(), e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HTTPError::new(e.status(), e.body_text()))?;

        state.uploads.check_count(files.len() + 1)?;
        state.uploads.check(&file_name, &content_type, bytes.len())?;
        files.push(PendingUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    if files.is_empty() {
        return Err(UploadError::Empty.into());
    }

    let urls = state.uploads.save_all(&files).await?;
    let attached = match state.store.push_car_images(&id, &urls).await {
        Ok(Some(car)) => Ok(car),
        Ok(None) => Err(HTTPError::not_found("Car not found")),
        Err(e) => Err(e.into()),
    };
    if attached.is_err() {
        warn!(
            event_name = "uploads.attach.failed",
            event_domain = "uploads",
            car_id = id.as_str(),
            files = urls.len(),
            "photos could not be attached, removing them"
        );
        state.uploads.discard(&urls).await;
    }
    Ok(ok(attached?))
}
