use std::sync::Arc;

use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::{debug, info, warn};

use super::password::{hash_password, validate_password, verify_password};
use super::AuthError;
use crate::config::JWTConfig;
use crate::models::{AuthPayload, Claims, LoginRequest, RegisterRequest, Role, User};
use crate::store::Store;

/// Registration, login and bearer-token verification over a `Store`.
pub struct Auth {
    store: Arc<dyn Store>,
    jwt: JWTConfig,
}

/// Lowercase and trim an email, rejecting obviously malformed ones.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidInput("Invalid email address".to_string())),
    }
}

impl Auth {
    pub fn new(store: Arc<dyn Store>, jwt: JWTConfig) -> Self {
        Auth { store, jwt }
    }

    /// Create a customer account and sign it in.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthPayload, AuthError> {
        let email = normalize_email(&request.email)?;
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("Name is required".to_string()));
        }
        validate_password(&request.password)?;

        let password_hash = hash_password(&request.password)?;
        let phone = request.phone.filter(|p| !p.trim().is_empty());
        // Accounts created through the API are always customers.
        let user = User::new(name, email, phone, Role::Customer);
        self.store.create_user(&user, &password_hash).await?;

        info!(
            event_name = "auth.register.success",
            event_domain = "auth",
            user_id = user.id.as_str(),
            "registered new account"
        );
        let token = user.to_jwt(&self.jwt)?;
        Ok(AuthPayload { token, user })
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, AuthError> {
        let email = normalize_email(&request.email).map_err(|_| AuthError::InvalidCredentials)?;
        let record = match self.store.find_user_by_email(&email).await? {
            Some(record) => record,
            None => {
                debug!("Login for unknown email.");
                return Err(AuthError::InvalidCredentials);
            }
        };
        if let Err(e) = verify_password(&request.password, &record.password_hash) {
            warn!(
                event_name = "auth.login.rejected",
                event_domain = "auth",
                user_id = record.user.id.as_str(),
                "password verification failed"
            );
            return Err(e);
        }

        info!(
            event_name = "auth.login.success",
            event_domain = "auth",
            user_id = record.user.id.as_str(),
            "user logged in"
        );
        let token = record.user.to_jwt(&self.jwt)?;
        Ok(AuthPayload {
            token,
            user: record.user,
        })
    }

    /// Verify a token we issued and decode its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.jwt.iss.as_str()]);
        validation.validate_aud = false;
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt.secret.as_ref()),
            &validation,
        )?;
        Ok(decoded.claims)
    }

    /// Resolve an `Authorization` header to the stored account it names.
    /// Returns None for a missing, malformed, expired or orphaned token.
    pub async fn authenticate(&self, auth_header: &str) -> Option<User> {
        let mut parts = auth_header.split_whitespace();
        let (auth_type, token) = match (parts.next(), parts.next(), parts.next()) {
            (Some(auth_type), Some(token), None) => (auth_type, token),
            _ => {
                debug!("Authorization header missing or malformed");
                return None;
            }
        };
        if !auth_type.eq_ignore_ascii_case("Bearer") {
            debug!("Unsupported auth type: '{}'", auth_type);
            return None;
        }

        let claims = match self.verify_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected bearer token: {}", e);
                return None;
            }
        };

        match self.store.get_user(&claims.sub).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!(
                    event_name = "auth.token.orphaned",
                    event_domain = "auth",
                    user_id = claims.sub.as_str(),
                    "valid token for an account that no longer exists"
                );
                None
            }
            Err(e) => {
                warn!("Failed to load user for token: {}", e);
                None
            }
        }
    }
}
