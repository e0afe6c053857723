//! State and actions behind the car detail page.

use std::sync::Arc;

use tracing::warn;

use super::format_price;
use super::order_form::OrderForm;
use crate::client::cache::{car_key, favorites_key};
use crate::client::{ClientError, Credential, QueryClient, Session};
use crate::models::{Car, CarStatus, Order, User};

/// Shown when a car has no photos.
pub const DEFAULT_IMAGE: &str = "/default-car.jpg";
/// Where a successful order navigates to.
pub const ORDERS_PATH: &str = "/orders";

pub struct CarDetailsController {
    session: Session,
    queries: Arc<QueryClient>,
    car_id: String,
    car: Option<Car>,
    favorites: Option<Vec<Car>>,
    selected_image: usize,
}

impl CarDetailsController {
    pub fn new(session: Session, queries: Arc<QueryClient>, car_id: impl Into<String>) -> Self {
        CarDetailsController {
            session,
            queries,
            car_id: car_id.into(),
            car: None,
            favorites: None,
            selected_image: 0,
        }
    }

    fn signed_in(&self) -> Option<(User, Credential)> {
        Some((self.session.user()?, self.session.credential()?))
    }

    /// Fetch the car and, for a logged-in user, their favorites. Both go
    /// through the query cache. A favorites failure only logs.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let api = self.session.api();
        let car_id = self.car_id.clone();
        let car = self
            .queries
            .cars
            .get_or_fetch(&car_key(&car_id), || api.car(&car_id))
            .await?;
        self.car = Some(car);
        self.selected_image = 0;

        self.favorites = None;
        if let Some((user, credential)) = self.signed_in() {
            let result = self
                .queries
                .favorites
                .get_or_fetch(&favorites_key(&user.id), || api.favorites(&credential))
                .await;
            match result {
                Ok(favorites) => self.favorites = Some(favorites),
                Err(e) => warn!("Could not load favorites: {}", e),
            }
        }
        Ok(())
    }

    pub fn car(&self) -> Option<&Car> {
        self.car.as_ref()
    }

    pub fn is_favorite(&self) -> bool {
        self.favorites
            .as_ref()
            .is_some_and(|favorites| favorites.iter().any(|car| car.id == self.car_id))
    }

    /// Ordering needs an available car and a logged-in user.
    pub fn can_order(&self) -> bool {
        self.session.is_authenticated()
            && self
                .car
                .as_ref()
                .is_some_and(|car| car.status == CarStatus::Available)
    }

    pub fn order_button_label(&self) -> &'static str {
        match self.car.as_ref().map(|car| car.status) {
            Some(CarStatus::Available) | None => "Reserve",
            Some(status) => status.label(),
        }
    }

    /// The large photo: the selected one, or the placeholder.
    pub fn primary_image(&self) -> &str {
        self.car
            .as_ref()
            .and_then(|car| car.images.get(self.selected_image))
            .map(String::as_str)
            .unwrap_or(DEFAULT_IMAGE)
    }

    /// Thumbnails only make sense with more than one photo.
    pub fn thumbnails(&self) -> &[String] {
        match &self.car {
            Some(car) if car.images.len() > 1 => &car.images,
            _ => &[],
        }
    }

    /// Indices past the end are ignored.
    pub fn select_image(&mut self, index: usize) {
        if self
            .car
            .as_ref()
            .is_some_and(|car| index < car.images.len())
        {
            self.selected_image = index;
        }
    }

    pub fn share_text(&self) -> Option<String> {
        self.car.as_ref().map(|car| {
            format!(
                "Check out this {} {} {} for {}",
                car.brand,
                car.model,
                car.year,
                format_price(car.price)
            )
        })
    }

    /// Add or remove this car from the favorites, then refresh the list and
    /// the session's favorites count. Returns whether the car is now a favorite.
    pub async fn toggle_favorite(&mut self) -> Result<bool, ClientError> {
        let (user, credential) = self.signed_in().ok_or(ClientError::NotAuthenticated)?;
        let api = self.session.api();
        if self.is_favorite() {
            api.remove_favorite(&credential, &self.car_id).await?;
        } else {
            api.add_favorite(&credential, &self.car_id).await?;
        }

        let key = favorites_key(&user.id);
        self.queries.favorites.invalidate(&key);
        let favorites = self
            .queries
            .favorites
            .get_or_fetch(&key, || api.favorites(&credential))
            .await?;
        self.session.update_favorites(favorites.len() as u64);
        self.favorites = Some(favorites);
        Ok(self.is_favorite())
    }

    /// Validate and submit the checkout form. Returns the page to go to next.
    pub async fn place_order(
        &mut self,
        form: &OrderForm,
    ) -> Result<(Order, &'static str), ClientError> {
        let credential = self
            .session
            .credential()
            .ok_or(ClientError::NotAuthenticated)?;
        let request = form
            .to_request(&self.car_id)
            .map_err(ClientError::Invalid)?;
        let order = self.session.api().create_order(&credential, &request).await?;
        // The car is reserved now; drop the stale copy.
        self.queries.cars.invalidate(&car_key(&self.car_id));
        Ok((order, ORDERS_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiClient, MemoryCredentialStore};
    use crate::models::PaymentMethod;
    use mockito::{Server, ServerGuard};

    const USER_JSON: &str =
        r#"{"id":"u1","name":"Aida","email":"aida@example.com","role":"customer"}"#;

    fn car_json(id: &str, status: &str, images: &str) -> String {
        format!(
            r#"{{"id":"{}","brand":"Toyota","model":"Camry","year":2020,"price":12500000,"fuelType":"petrol","transmission":"automatic","status":"{}","images":{}}}"#,
            id, status, images
        )
    }

    fn ok_body(data: &str) -> String {
        format!(r#"{{"success":true,"data":{}}}"#, data)
    }

    async fn logged_in(server: &mut ServerGuard) -> Session {
        let _profile = server
            .mock("GET", "/api/auth/profile")
            .with_status(200)
            .with_body(ok_body(USER_JSON))
            .create_async()
            .await;
        let _favorites = server
            .mock("GET", "/api/users/me/favorites")
            .with_status(200)
            .with_body(ok_body("[]"))
            .expect_at_most(1)
            .create_async()
            .await;
        let session = Session::new(
            ApiClient::new(server.url()),
            Arc::new(MemoryCredentialStore::with_credential("T")),
        );
        session.restore().await;
        server.reset();
        session
    }

    #[tokio::test]
    async fn test_anonymous_view() {
        let mut server = Server::new_async().await;
        let car = server
            .mock("GET", "/api/cars/c1")
            .with_status(200)
            .with_body(ok_body(&car_json("c1", "available", "[]")))
            .expect(1)
            .create_async()
            .await;
        let session = Session::new(
            ApiClient::new(server.url()),
            Arc::new(MemoryCredentialStore::new()),
        );
        session.restore().await;

        let queries = Arc::new(QueryClient::default());
        let mut view = CarDetailsController::new(session.clone(), queries.clone(), "c1");
        view.load().await.unwrap();
        // A second controller reads through the cache.
        let mut again = CarDetailsController::new(session, queries, "c1");
        again.load().await.unwrap();
        car.assert_async().await;

        assert!(!view.can_order());
        assert!(!view.is_favorite());
        assert_eq!(view.order_button_label(), "Reserve");
        assert_eq!(view.primary_image(), DEFAULT_IMAGE);
        assert_eq!(
            view.share_text().as_deref(),
            Some("Check out this Toyota Camry 2020 for 12 500 000 ₸")
        );
        assert!(matches!(
            view.toggle_favorite().await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_images_and_status() {
        let mut server = Server::new_async().await;
        let session = logged_in(&mut server).await;
        let _car = server
            .mock("GET", "/api/cars/c2")
            .with_status(200)
            .with_body(ok_body(&car_json("c2", "sold", r#"["/a.jpg","/b.jpg"]"#)))
            .create_async()
            .await;
        let _favorites = server
            .mock("GET", "/api/users/me/favorites")
            .with_status(200)
            .with_body(ok_body("[]"))
            .create_async()
            .await;

        let mut view = CarDetailsController::new(session, Arc::new(QueryClient::default()), "c2");
        view.load().await.unwrap();
        assert_eq!(view.primary_image(), "/a.jpg");
        view.select_image(1);
        assert_eq!(view.primary_image(), "/b.jpg");
        view.select_image(9);
        assert_eq!(view.primary_image(), "/b.jpg");
        assert_eq!(view.thumbnails().len(), 2);
        assert!(!view.can_order());
        assert_eq!(view.order_button_label(), "Sold");
    }

    #[tokio::test]
    async fn test_toggle_favorite_updates_session_count() {
        let mut server = Server::new_async().await;
        let session = logged_in(&mut server).await;
        let car = car_json("c1", "available", "[]");
        let _car = server
            .mock("GET", "/api/cars/c1")
            .with_status(200)
            .with_body(ok_body(&car))
            .create_async()
            .await;
        let empty = server
            .mock("GET", "/api/users/me/favorites")
            .with_status(200)
            .with_body(ok_body("[]"))
            .expect(1)
            .create_async()
            .await;

        let mut view =
            CarDetailsController::new(session.clone(), Arc::new(QueryClient::default()), "c1");
        view.load().await.unwrap();
        assert!(view.can_order());
        assert!(!view.is_favorite());
        empty.assert_async().await;
        server.reset();

        let add = server
            .mock("POST", "/api/users/me/favorites")
            .match_header("authorization", "Bearer T")
            .match_body(mockito::Matcher::JsonString(r#"{"carId":"c1"}"#.to_string()))
            .with_status(200)
            .with_body(ok_body(&format!("[{}]", car)))
            .create_async()
            .await;
        let refetch = server
            .mock("GET", "/api/users/me/favorites")
            .with_status(200)
            .with_body(ok_body(&format!("[{}]", car)))
            .expect(1)
            .create_async()
            .await;

        assert!(view.toggle_favorite().await.unwrap());
        add.assert_async().await;
        refetch.assert_async().await;
        assert!(view.is_favorite());
        assert_eq!(session.favorite_count(), 1);
    }

    #[tokio::test]
    async fn test_place_order() {
        let mut server = Server::new_async().await;
        let session = logged_in(&mut server).await;
        let order = server
            .mock("POST", "/api/orders")
            .match_header("authorization", "Bearer T")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"carId":"c1","paymentMethod":"cash"}"#.to_string(),
            ))
            .with_status(201)
            .with_body(ok_body(
                r#"{"id":"o1","userId":"u1","carId":"c1","paymentMethod":"cash","deliveryAddress":{"city":"Almaty","street":"Abay","house":"1"},"totalPrice":5,"status":"pending"}"#,
            ))
            .create_async()
            .await;

        let mut view = CarDetailsController::new(session, Arc::new(QueryClient::default()), "c1");

        let invalid = view.place_order(&OrderForm::default()).await.unwrap_err();
        assert!(matches!(invalid, ClientError::Invalid(_)));

        let form = OrderForm {
            payment_method: Some(PaymentMethod::Cash),
            city: "Almaty".into(),
            street: "Abay".into(),
            house: "1".into(),
            ..Default::default()
        };
        let (placed, next) = view.place_order(&form).await.unwrap();
        order.assert_async().await;
        assert_eq!(placed.id, "o1");
        assert_eq!(next, "/orders");
    }
}
