//! Persistence for the bearer credential between application runs.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::ClientError;

/// The single key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "token";

/// An opaque bearer token. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Where the session keeps its credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Credential>, ClientError>;
    async fn save(&self, credential: &Credential) -> Result<(), ClientError>;
    /// Removing a credential that is not there succeeds.
    async fn clear(&self) -> Result<(), ClientError>;
}

/// Keeps the credential in a small JSON object file, `{"token": "..."}`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore { path: path.into() }
    }

    async fn read_map(&self) -> Result<HashMap<String, String>, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::Storage(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec(map).map_err(|e| ClientError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| ClientError::Storage(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, ClientError> {
        let map = self.read_map().await?;
        Ok(map
            .get(CREDENTIAL_KEY)
            .filter(|token| !token.is_empty())
            .map(Credential::new))
    }

    async fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        let mut map = self.read_map().await?;
        map.insert(CREDENTIAL_KEY.to_string(), credential.as_str().to_string());
        self.write_map(&map).await
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let mut map = self.read_map().await?;
        if map.remove(CREDENTIAL_KEY).is_none() {
            debug!("No stored credential to clear");
            return Ok(());
        }
        self.write_map(&map).await
    }
}

/// Process-local credential storage.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`, as if a previous run had logged in.
    pub fn with_credential(token: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(CREDENTIAL_KEY.to_string(), token.to_string());
        store
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, ClientError> {
        Ok(self
            .values()
            .get(CREDENTIAL_KEY)
            .filter(|token| !token.is_empty())
            .map(Credential::new))
    }

    async fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        self.values()
            .insert(CREDENTIAL_KEY.to_string(), credential.as_str().to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        self.values().remove(CREDENTIAL_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let credential = Credential::new("secret-token");
        assert!(!format!("{:?}", credential).contains("secret-token"));
        assert_eq!(credential.bearer(), "Bearer secret-token");
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("autosalon-cred-{}", uuid::Uuid::new_v4()))
            .join("session.json");

        let store = FileCredentialStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
        store.save(&Credential::new("T1")).await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), Some(Credential::new("T1")));

        let raw: HashMap<String, String> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw.get("token").map(String::as_str), Some("T1"));

        reopened.clear().await.unwrap();
        reopened.clear().await.unwrap();
        assert!(reopened.load().await.unwrap().is_none());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryCredentialStore::with_credential("T");
        assert_eq!(store.load().await.unwrap(), Some(Credential::new("T")));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_token_is_no_credential() {
        let memory = MemoryCredentialStore::with_credential("");
        assert!(memory.load().await.unwrap().is_none());

        let path = std::env::temp_dir().join(format!("autosalon-cred-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"token":""}"#).unwrap();
        assert!(FileCredentialStore::new(&path).load().await.unwrap().is_none());
        let _ = std::fs::remove_file(&path);
    }
}
