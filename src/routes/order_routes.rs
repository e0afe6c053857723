//! Order endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Utc;
use tracing::{info, warn};

use crate::models::{
    AdminUser, CarStatus, Envelope, Order, OrderRequest, OrderStatus, OrderStatusUpdate, User,
};
use crate::state::AppState;
use crate::utils::http_helpers::{created, ok, AppJson, AppPath, HTTPError};

/// Registers order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}/status", patch(update_status))
}

/// Places an order and reserves the car.
async fn create_order(
    user: User,
    State(state): State<AppState>,
    AppJson(request): AppJson<OrderRequest>,
) -> Result<(StatusCode, Json<Envelope<Order>>), HTTPError> {
    if let Err(errors) = request.validate() {
        return Err(HTTPError::bad_request(errors.to_string()));
    }
    let payment_method = request
        .payment_method
        .ok_or_else(|| HTTPError::bad_request("Select a payment method"))?;

    if state.store.get_car(&request.car_id).await?.is_none() {
        return Err(HTTPError::not_found("Car not found"));
    }
    // The conditional transition is what stops two buyers reserving one car.
    let car = state
        .store
        .transition_car(&request.car_id, CarStatus::Available, CarStatus::Reserved)
        .await?
        .ok_or_else(|| HTTPError::bad_request("Car is not available"))?;

    let order = Order::new(user.id.clone(), request, payment_method, car.price);
    if let Err(e) = state.store.insert_order(&order).await {
        // Release the reservation so the car does not get stuck.
        let _ = state
            .store
            .transition_car(&car.id, CarStatus::Reserved, CarStatus::Available)
            .await;
        return Err(e.into());
    }

    info!(
        event_name = "orders.created",
        event_domain = "orders",
        order_id = order.id.as_str(),
        car_id = car.id.as_str(),
        user_id = user.id.as_str(),
        "order placed"
    );
    Ok(created(order))
}

/// The caller's orders, or every order for admins.
async fn list_orders(
    user: User,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<Vec<Order>>>), HTTPError> {
    let scope = if user.is_admin() {
        None
    } else {
        Some(user.id.as_str())
    };
    Ok(ok(state.store.list_orders(scope).await?))
}

async fn update_status(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppJson(update): AppJson<OrderStatusUpdate>,
) -> Result<(StatusCode, Json<Envelope<Order>>), HTTPError> {
    let mut order = state
        .store
        .get_order(&id)
        .await?
        .ok_or_else(|| HTTPError::not_found("Order not found"))?;

    let car_move = match update.status {
        OrderStatus::Cancelled => Some((CarStatus::Reserved, CarStatus::Available)),
        OrderStatus::Completed => Some((CarStatus::Reserved, CarStatus::Sold)),
        OrderStatus::Pending | OrderStatus::Confirmed => None,
    };
    if let Some((from, to)) = car_move {
        if state
            .store
            .transition_car(&order.car_id, from, to)
            .await?
            .is_none()
        {
            warn!(
                event_name = "orders.car_state.mismatch",
                event_domain = "orders",
                order_id = order.id.as_str(),
                car_id = order.car_id.as_str(),
                "car was not reserved when the order status changed"
            );
        }
    }

    order.status = update.status;
    order.updated_at = Some(Utc::now());
    state.store.replace_order(&order).await?;
    Ok(ok(order))
}
