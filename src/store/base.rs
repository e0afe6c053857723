use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{memory_store::MemoryStore, mongodb_store::MongoDBStore};
use crate::config::StoreConfig;
use crate::models::{Car, CarInput, CarQuery, CarStatus, Order, ProfileUpdate, User};

/// Failures a storage backend can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// An account together with its password hash, as held by the store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

/// The Store trait abstracts persistence of accounts, favorites, cars and orders.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new account. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<(), StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Car ids the user has favorited, oldest first.
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
    /// Adding an id that is already present is a no-op.
    async fn add_favorite(&self, user_id: &str, car_id: &str) -> Result<(), StoreError>;
    /// Removing an id that is not present is a no-op.
    async fn remove_favorite(&self, user_id: &str, car_id: &str) -> Result<(), StoreError>;

    /// Cars matching the query, newest first.
    async fn list_cars(&self, query: &CarQuery) -> Result<Vec<Car>, StoreError>;
    async fn get_car(&self, id: &str) -> Result<Option<Car>, StoreError>;
    /// The cars for the given ids, in the order of `ids`. Unknown ids are skipped.
    async fn get_cars(&self, ids: &[String]) -> Result<Vec<Car>, StoreError>;
    async fn insert_car(&self, car: &Car) -> Result<(), StoreError>;
    /// Applies the editable fields of `input` in one step. Status changes only
    /// when `input.status` is set; images and creation time are untouched.
    /// Returns the updated car, or `None` if it does not exist.
    async fn update_car(&self, id: &str, input: &CarInput) -> Result<Option<Car>, StoreError>;
    /// Appends image URLs without touching any other field.
    async fn push_car_images(
        &self,
        id: &str,
        urls: &[String],
    ) -> Result<Option<Car>, StoreError>;
    async fn delete_car(&self, id: &str) -> Result<(), StoreError>;
    /// Atomically moves a car from `from` to `to`. Returns the updated car, or
    /// `None` if no car with that id is currently in state `from`.
    async fn transition_car(
        &self,
        id: &str,
        from: CarStatus,
        to: CarStatus,
    ) -> Result<Option<Car>, StoreError>;
    /// Distinct brand names, sorted.
    async fn brands(&self) -> Result<Vec<String>, StoreError>;

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;
    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError>;
    /// Orders newest first, optionally restricted to one user.
    async fn list_orders(&self, user_id: Option<&str>) -> Result<Vec<Order>, StoreError>;
    async fn replace_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Whether the backend is reachable.
    async fn ping(&self) -> bool;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config {
        StoreConfig::MongoDB(mongo_config) => {
            let store = MongoDBStore::new(mongo_config)
                .await
                .map_err(StoreError::Backend)?;
            info!("Successfully created MongoDB store.");
            Ok(Arc::new(store))
        }
        StoreConfig::Memory => {
            info!("Using in-memory store. Data will not survive a restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
