//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! configuration, authentication, persistence and photo uploads.

use crate::auth::Auth;
use crate::config::ConfigV1;
use crate::store::Store;
use crate::uploads::UploadStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Registration, login and bearer verification.
    pub auth: Arc<Auth>,
    /// Accounts, favorites, cars and orders.
    pub store: Arc<dyn Store>,
    pub uploads: Arc<UploadStore>,
}
