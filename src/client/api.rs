//! Typed client for the dealership REST API.

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::credentials::Credential;
use super::ClientError;
use crate::models::{
    AuthPayload, Car, CarInput, CarQuery, Envelope, FavoriteRequest, LoginRequest, Order,
    OrderRequest, OrderStatus, OrderStatusUpdate, ProfileUpdate, RegisterRequest, User,
};

/// One image to upload with `upload_car_images`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Thin wrapper around `reqwest::Client` that speaks the envelope protocol.
/// The client holds no credential of its own; callers pass one per request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("API request: {} {}", method, url);
        let builder = self.http.request(method, url);
        match credential {
            Some(credential) => builder.header(reqwest::header::AUTHORIZATION, credential.bearer()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        decode_envelope(response).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ClientError> {
        self.send(self.request(Method::POST, "/api/auth/login", None).json(request))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ClientError> {
        self.send(
            self.request(Method::POST, "/api/auth/register", None)
                .json(request),
        )
        .await
    }

    pub async fn profile(&self, credential: &Credential) -> Result<User, ClientError> {
        self.send(self.request(Method::GET, "/api/auth/profile", Some(credential)))
            .await
    }

    pub async fn update_profile(
        &self,
        credential: &Credential,
        update: &ProfileUpdate,
    ) -> Result<User, ClientError> {
        self.send(
            self.request(Method::PUT, "/api/users/me", Some(credential))
                .json(update),
        )
        .await
    }

    pub async fn favorites(&self, credential: &Credential) -> Result<Vec<Car>, ClientError> {
        self.send(self.request(Method::GET, "/api/users/me/favorites", Some(credential)))
            .await
    }

    /// Returns the favorites list after the addition.
    pub async fn add_favorite(
        &self,
        credential: &Credential,
        car_id: &str,
    ) -> Result<Vec<Car>, ClientError> {
        let body = FavoriteRequest {
            car_id: car_id.to_string(),
        };
        self.send(
            self.request(Method::POST, "/api/users/me/favorites", Some(credential))
                .json(&body),
        )
        .await
    }

    /// Returns the favorites list after the removal.
    pub async fn remove_favorite(
        &self,
        credential: &Credential,
        car_id: &str,
    ) -> Result<Vec<Car>, ClientError> {
        let path = format!("/api/users/me/favorites/{}", car_id);
        self.send(self.request(Method::DELETE, &path, Some(credential)))
            .await
    }

    pub async fn list_cars(&self, query: &CarQuery) -> Result<Vec<Car>, ClientError> {
        self.send(self.request(Method::GET, "/api/cars", None).query(query))
            .await
    }

    pub async fn brands(&self) -> Result<Vec<String>, ClientError> {
        self.send(self.request(Method::GET, "/api/cars/brands", None))
            .await
    }

    pub async fn car(&self, id: &str) -> Result<Car, ClientError> {
        let path = format!("/api/cars/{}", id);
        self.send(self.request(Method::GET, &path, None)).await
    }

    pub async fn create_car(
        &self,
        credential: &Credential,
        input: &CarInput,
    ) -> Result<Car, ClientError> {
        self.send(
            self.request(Method::POST, "/api/cars", Some(credential))
                .json(input),
        )
        .await
    }

    pub async fn update_car(
        &self,
        credential: &Credential,
        id: &str,
        input: &CarInput,
    ) -> Result<Car, ClientError> {
        let path = format!("/api/cars/{}", id);
        self.send(self.request(Method::PUT, &path, Some(credential)).json(input))
            .await
    }

    pub async fn delete_car(&self, credential: &Credential, id: &str) -> Result<(), ClientError> {
        let path = format!("/api/cars/{}", id);
        let response = self
            .request(Method::DELETE, &path, Some(credential))
            .send()
            .await?;
        decode_envelope::<Option<Value>>(response).await.map(|_| ())
    }

    pub async fn upload_car_images(
        &self,
        credential: &Credential,
        id: &str,
        images: Vec<ImageUpload>,
    ) -> Result<Car, ClientError> {
        let mut form = Form::new();
        for image in images {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)
                .map_err(|_| ClientError::InvalidContentType {
                    file_name: image.file_name,
                    content_type: image.content_type,
                })?;
            form = form.part("images", part);
        }
        let path = format!("/api/cars/{}/images", id);
        self.send(
            self.request(Method::POST, &path, Some(credential))
                .multipart(form),
        )
        .await
    }

    pub async fn create_order(
        &self,
        credential: &Credential,
        request: &OrderRequest,
    ) -> Result<Order, ClientError> {
        self.send(
            self.request(Method::POST, "/api/orders", Some(credential))
                .json(request),
        )
        .await
    }

    pub async fn orders(&self, credential: &Credential) -> Result<Vec<Order>, ClientError> {
        self.send(self.request(Method::GET, "/api/orders", Some(credential)))
            .await
    }

    pub async fn update_order_status(
        &self,
        credential: &Credential,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, ClientError> {
        let path = format!("/api/orders/{}/status", id);
        self.send(
            self.request(Method::PATCH, &path, Some(credential))
                .json(&OrderStatusUpdate { status }),
        )
        .await
    }
}

/// Unwraps `{ success, data, message }`. Error bodies keep the server's message.
async fn decode_envelope<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Envelope<Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
    if !envelope.success {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| "Request failed".to_string()),
        });
    }
    match envelope.data {
        Some(data) => Ok(data),
        // Tolerates `Option<_>` targets for endpoints that send no data.
        None => serde_json::from_value(Value::Null)
            .map_err(|_| ClientError::Decode("response has no data".to_string())),
    }
}
