use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::models::Envelope;
use crate::store::StoreError;
use crate::uploads::UploadError;

/// A general purpose HTTP error type that renders as a failure envelope.
#[derive(Debug)]
pub struct HTTPError {
    status: StatusCode,
    message: String,
}

impl HTTPError {
    /// Creates a new HTTP error with the given status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HTTPError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Converts our `HTTPError` into an HTTP response.
impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::failure(self.message))).into_response()
    }
}

impl From<StoreError> for HTTPError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => HTTPError::not_found(format!("{} not found", what)),
            StoreError::Conflict(message) => HTTPError::bad_request(message),
            StoreError::Backend(detail) => {
                error!(
                    event_name = "store.backend.error",
                    event_domain = "store",
                    detail = detail.as_str(),
                    "storage backend failed"
                );
                HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<AuthError> for HTTPError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(message) => HTTPError::bad_request(message),
            AuthError::UserAlreadyExists => HTTPError::bad_request("User already exists"),
            AuthError::InvalidCredentials => {
                HTTPError::new(StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AuthError::Store(store) => store.into(),
            AuthError::Token(_) | AuthError::PasswordHash(_) => {
                error!(
                    event_name = "auth.internal.error",
                    event_domain = "auth",
                    error = %e,
                    "authentication backend failed"
                );
                HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<UploadError> for HTTPError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Io(_) => {
                error!(
                    event_name = "uploads.io.error",
                    event_domain = "uploads",
                    error = %e,
                    "failed to store uploaded file"
                );
                HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            other => HTTPError::bad_request(other.to_string()),
        }
    }
}

impl From<JsonRejection> for HTTPError {
    fn from(rejection: JsonRejection) -> Self {
        HTTPError::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for HTTPError {
    fn from(rejection: QueryRejection) -> Self {
        HTTPError::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for HTTPError {
    fn from(rejection: PathRejection) -> Self {
        HTTPError::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for HTTPError {
    fn from(rejection: MultipartRejection) -> Self {
        HTTPError::new(rejection.status(), rejection.body_text())
    }
}

/// `Json` body extractor whose rejections render as a failure envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(HTTPError))]
pub struct AppJson<T>(pub T);

/// `Query` extractor whose rejections render as a failure envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(HTTPError))]
pub struct AppQuery<T>(pub T);

/// `Path` extractor whose rejections render as a failure envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(HTTPError))]
pub struct AppPath<T>(pub T);

/// `Multipart` extractor whose rejections render as a failure envelope.
pub struct AppMultipart(pub Multipart);

impl<S> FromRequest<S> for AppMultipart
where
    S: Send + Sync,
{
    type Rejection = HTTPError;

    async fn from_request(req: Request, state: &S) -> Result<Self, HTTPError> {
        Ok(AppMultipart(Multipart::from_request(req, state).await?))
    }
}

/// Wraps `data` in a success envelope with status 200.
pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::OK, Json(Envelope::ok(data)))
}

/// Wraps `data` in a success envelope with status 201.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, Json(Envelope::ok(data)))
}
