//! Application startup and server initialization.
//!
//! This module wires the store, authentication and upload storage into
//! an `AppState` and serves the router on the configured address.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::Auth;
use crate::config::ConfigV1;
use crate::routes;
use crate::state::AppState;
use crate::store::create_store;
use crate::uploads::UploadStore;

/// Builds the shared state for a configuration without binding a socket.
pub async fn build_state(config: Arc<ConfigV1>) -> Result<AppState, Box<dyn std::error::Error>> {
    let store = create_store(&config.store).await?;
    let auth = Arc::new(Auth::new(store.clone(), config.jwt.clone()));
    let uploads = Arc::new(UploadStore::new(&config.uploads));
    uploads.ensure_dir().await?;

    Ok(AppState {
        config,
        auth,
        store,
        uploads,
    })
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the store cannot be reached, the upload directory
/// cannot be created, or the server fails to bind to the configured address.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config.clone()).await?;
    let app = routes::create_router(state);

    info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
