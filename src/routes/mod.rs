//! HTTP route definitions and handlers.
//!
//! This module organizes all HTTP endpoints into logical groups:
//! authentication, the car catalog, user profile and favorites, orders
//! and health checks.

mod auth_routes;
mod car_routes;
mod health_routes;
mod order_routes;
mod user_routes;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Creates the application router with all configured routes.
///
/// Combines all route modules into a single router, mounts the upload
/// directory and attaches the application state for access in handlers.
pub fn create_router(state: AppState) -> Router {
    // Room for a full batch of images plus multipart framing.
    let body_limit = state
        .uploads
        .max_file_size()
        .saturating_mul(state.uploads.max_files())
        .saturating_add(64 * 1024);

    Router::new()
        .merge(auth_routes::routes())
        .merge(car_routes::routes())
        .merge(user_routes::routes())
        .merge(order_routes::routes())
        .merge(health_routes::routes())
        .nest_service("/uploads", ServeDir::new(state.uploads.root()))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config.cors.origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn route_not_found() -> HTTPError {
    HTTPError::new(StatusCode::NOT_FOUND, "Route not found")
}

async fn method_not_allowed() -> HTTPError {
    HTTPError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
