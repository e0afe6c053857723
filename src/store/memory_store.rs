use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::base::{Store, StoreError, UserRecord};
use crate::models::{Car, CarInput, CarQuery, CarStatus, Order, ProfileUpdate, User};

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    favorites: Vec<String>,
}

#[derive(Default)]
struct Data {
    users: HashMap<String, StoredUser>,
    /// Insertion order doubles as creation order.
    cars: Vec<Car>,
    orders: Vec<Order>,
}

/// A `Store` that keeps everything in process memory.
/// Used for local development and by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Data> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        if data
            .users
            .values()
            .any(|u| u.record.user.email == user.email)
        {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }
        data.users.insert(
            user.id.clone(),
            StoredUser {
                record: UserRecord {
                    user: user.clone(),
                    password_hash: password_hash.to_string(),
                },
                favorites: Vec::new(),
            },
        );
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.record.user.email == email)
            .map(|u| u.record.clone()))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(id).map(|u| u.record.user.clone()))
    }

    async fn update_user(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut data = self.write();
        let stored = data.users.get_mut(id).ok_or(StoreError::NotFound("User"))?;
        let user = &mut stored.record.user;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        Ok(user.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .read()
            .users
            .values()
            .map(|u| u.record.user.clone())
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.read()
            .users
            .get(user_id)
            .map(|u| u.favorites.clone())
            .ok_or(StoreError::NotFound("User"))
    }

    async fn add_favorite(&self, user_id: &str, car_id: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        let stored = data
            .users
            .get_mut(user_id)
            .ok_or(StoreError::NotFound("User"))?;
        if !stored.favorites.iter().any(|id| id == car_id) {
            stored.favorites.push(car_id.to_string());
        }
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, car_id: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        let stored = data
            .users
            .get_mut(user_id)
            .ok_or(StoreError::NotFound("User"))?;
        stored.favorites.retain(|id| id != car_id);
        Ok(())
    }

    async fn list_cars(&self, query: &CarQuery) -> Result<Vec<Car>, StoreError> {
        Ok(self
            .read()
            .cars
            .iter()
            .rev()
            .filter(|car| query.matches(car))
            .cloned()
            .collect())
    }

    async fn get_car(&self, id: &str) -> Result<Option<Car>, StoreError> {
        Ok(self.read().cars.iter().find(|c| c.id == id).cloned())
    }

    async fn get_cars(&self, ids: &[String]) -> Result<Vec<Car>, StoreError> {
        let data = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| data.cars.iter().find(|c| &c.id == id).cloned())
            .collect())
    }

    async fn insert_car(&self, car: &Car) -> Result<(), StoreError> {
        let mut data = self.write();
        if data.cars.iter().any(|c| c.id == car.id) {
            return Err(StoreError::Conflict(format!("Car {} already exists", car.id)));
        }
        data.cars.push(car.clone());
        Ok(())
    }

    async fn update_car(&self, id: &str, input: &CarInput) -> Result<Option<Car>, StoreError> {
        let mut data = self.write();
        Ok(data.cars.iter_mut().find(|c| c.id == id).map(|car| {
            car.apply(input.clone());
            car.clone()
        }))
    }

    async fn push_car_images(
        &self,
        id: &str,
        urls: &[String],
    ) -> Result<Option<Car>, StoreError> {
        let mut data = self.write();
        Ok(data.cars.iter_mut().find(|c| c.id == id).map(|car| {
            car.images.extend_from_slice(urls);
            car.updated_at = Some(Utc::now());
            car.clone()
        }))
    }

    async fn delete_car(&self, id: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        let before = data.cars.len();
        data.cars.retain(|c| c.id != id);
        if data.cars.len() == before {
            return Err(StoreError::NotFound("Car"));
        }
        Ok(())
    }

    async fn transition_car(
        &self,
        id: &str,
        from: CarStatus,
        to: CarStatus,
    ) -> Result<Option<Car>, StoreError> {
        let mut data = self.write();
        match data
            .cars
            .iter_mut()
            .find(|c| c.id == id && c.status == from)
        {
            Some(car) => {
                car.status = to;
                car.updated_at = Some(Utc::now());
                Ok(Some(car.clone()))
            }
            None => Ok(None),
        }
    }

    async fn brands(&self) -> Result<Vec<String>, StoreError> {
        let mut brands: Vec<String> = self.read().cars.iter().map(|c| c.brand.clone()).collect();
        brands.sort();
        brands.dedup();
        Ok(brands)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.write().orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.read().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, user_id: Option<&str>) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .read()
            .orders
            .iter()
            .rev()
            .filter(|o| user_id.map_or(true, |uid| o.user_id == uid))
            .cloned()
            .collect())
    }

    async fn replace_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut data = self.write();
        let slot = data
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(StoreError::NotFound("Order"))?;
        *slot = order.clone();
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}
