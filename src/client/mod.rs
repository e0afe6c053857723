//! The storefront client: session state, API access, credential persistence
//! and the query cache the views read through.

pub mod api;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod session;

pub use api::{ApiClient, ImageUpload};
pub use cache::{QueryCache, QueryClient};
pub use config::ClientConfig;
pub use credentials::{
    Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, CREDENTIAL_KEY,
};
pub use error::ClientError;
pub use session::{Session, SessionSnapshot};
