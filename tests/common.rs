#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use autosalon::auth::password::hash_password;
use autosalon::config::{Config, ConfigV1};
use autosalon::models::{Role, User};
use autosalon::routes::create_router;
use autosalon::startup::build_state;
use autosalon::state::AppState;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
bind_address: 127.0.0.1:0
logging:
  level: "debug"
  format: "json"
store:
  type: memory
jwt:
  iss: autosalon-test
  exp: 3600
  secret: integration-secret
"#;

pub const ADMIN_EMAIL: &str = "admin@autosalon.kz";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Parses `TEST_CONFIG` and points uploads at a fresh temp directory.
pub fn test_config() -> ConfigV1 {
    let config: Config = Figment::new()
        .merge(Yaml::string(TEST_CONFIG))
        .extract()
        .expect("test config should parse");
    let Config::ConfigV1(mut config) = config;
    config.uploads.dir = std::env::temp_dir().join(format!(
        "autosalon-it-{}",
        uuid::Uuid::new_v4().simple()
    ));
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = build_state(Arc::new(test_config()))
            .await
            .expect("state should build");
        // Admins are provisioned out of band, never through registration.
        let admin = User::new(
            "Admin".to_string(),
            ADMIN_EMAIL.to_string(),
            None,
            Role::Admin,
        );
        state
            .store
            .create_user(&admin, &hash_password(ADMIN_PASSWORD).expect("hash"))
            .await
            .expect("admin should be created");

        TestApp {
            router: create_router(state.clone()),
            state,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.state.config.uploads.dir.clone()
    }

    /// Sends a JSON request and returns the status and the decoded body
    /// (`Value::Null` when the body is not JSON).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Registers a customer and returns `(token, user id)`.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Adds a car as admin and returns its id.
    pub async fn create_car(
        &self,
        admin: &str,
        brand: &str,
        model: &str,
        year: i32,
        price: i64,
    ) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/cars",
                Some(admin),
                Some(car_body(brand, model, year, price)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create car failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn car_body(brand: &str, model: &str, year: i32, price: i64) -> Value {
    json!({
        "brand": brand,
        "model": model,
        "year": year,
        "price": price,
        "mileage": 15000,
        "fuelType": "petrol",
        "transmission": "automatic",
        "features": ["Leather seats"]
    })
}

pub fn order_body(car_id: &str) -> Value {
    json!({
        "carId": car_id,
        "paymentMethod": "cash",
        "deliveryAddress": {"city": "Almaty", "street": "Abay", "house": "10"},
        "notes": "Call before delivery"
    })
}

/// A `multipart/form-data` request carrying `files` as `(name, content type, bytes)`.
pub fn multipart_request(
    path: &str,
    token: &str,
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let boundary = "autosalon-test-boundary";
    let mut body = Vec::new();
    for (name, content_type, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .expect("failed to build multipart request")
}
