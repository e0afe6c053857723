pub mod error;
pub mod password;
pub mod service;

// Re-export so we can do "use crate::auth::{Auth, AuthError};"
pub use error::AuthError;
pub use service::Auth;
