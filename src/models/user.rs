use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use http::request::Parts;
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::config::JWTConfig;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Account role. Customers browse and order, admins manage the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// The User struct represents an account as the server exposes it.
/// Password material never leaves the store layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Claims carried by the bearer tokens we issue.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl User {
    /// Construct a new User with a freshly generated id.
    pub fn new(name: String, email: String, phone: Option<String>, role: Role) -> Self {
        User {
            id: ObjectId::new().to_hex(),
            name,
            email,
            phone,
            role,
            created_at: Some(Utc::now()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Convert a User into a signed JWT string, using the config from `JWTConfig`.
    pub fn to_jwt(&self, jwtconfig: &JWTConfig) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: self.id.clone(),
            role: self.role,
            iss: jwtconfig.iss.clone(),
            iat: now,
            exp: now + jwtconfig.exp,
        };

        let encoding_key = EncodingKey::from_secret(jwtconfig.secret.as_ref());
        encode(&Header::default(), &claims, &encoding_key)
    }
}

/// Request extractor for User.
/// Resolves the bearer token in the Authorization header to a stored account.
impl FromRequestParts<AppState> for User {
    type Rejection = HTTPError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<User, HTTPError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        match state.auth.authenticate(auth_header).await {
            Some(user) => Ok(user),
            None => Err(HTTPError::new(
                StatusCode::UNAUTHORIZED,
                "Unauthorized access",
            )),
        }
    }
}

/// Extractor that only admits admin accounts.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = HTTPError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<AdminUser, HTTPError> {
        let user = User::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(
                event_name = "auth.admin.denied",
                event_domain = "auth",
                user_id = user.id.as_str(),
                "non-admin user attempted an admin operation"
            );
            return Err(HTTPError::new(StatusCode::FORBIDDEN, "Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn decode_claims(token: &str, jwt_config: &JWTConfig) -> Claims {
        let mut validation = Validation::default();
        validation.validate_aud = false;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_config.secret.as_ref()),
            &validation,
        )
        .expect("Failed to decode JWT")
        .claims
    }

    fn default_jwt_config() -> JWTConfig {
        JWTConfig {
            iss: "test_issuer".to_string(),
            exp: 3600,
            secret: "secretkey".to_string(),
        }
    }

    #[test]
    fn test_to_jwt_and_decode() {
        let user = User::new(
            "Aigerim".to_string(),
            "aigerim@example.com".to_string(),
            None,
            Role::Admin,
        );
        let jwt_config = default_jwt_config();
        let token = user.to_jwt(&jwt_config).unwrap();

        let claims = decode_claims(&token, &jwt_config);
        assert_eq!(claims.iss, jwt_config.iss);
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_user_json_shape() {
        let user = User::new("Dana".into(), "dana@example.com".into(), None, Role::Customer);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "customer");
        assert!(json.get("phone").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_user_deserializes_without_optional_fields() {
        let user: User =
            serde_json::from_str(r#"{"id":"1","name":"A","email":"a@b.com"}"#).unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.role, Role::Customer);
        assert!(user.created_at.is_none());
    }
}
