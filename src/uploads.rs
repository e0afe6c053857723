//! Storage for car photos uploaded through the admin API.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::UploadConfig;

/// Image kinds we accept, checked against both the extension and the MIME subtype.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

/// URL prefix under which stored photos are served.
pub const PUBLIC_PREFIX: &str = "/uploads/cars";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only images are allowed (jpeg, jpg, png, webp)")]
    UnsupportedType,
    #[error("File is too large (max {max} bytes)")]
    TooLarge { max: usize },
    #[error("Too many files (max {max})")]
    TooManyFiles { max: usize },
    #[error("No files uploaded")]
    Empty,
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A checked file waiting to be written.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Writes accepted uploads under `<dir>/cars`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_file_size: usize,
    max_files: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        UploadStore {
            dir: config.dir.clone(),
            max_file_size: config.max_file_size,
            max_files: config.max_files,
        }
    }

    /// The directory served at `/uploads`.
    pub fn root(&self) -> &Path {
        &self.dir
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    fn cars_dir(&self) -> PathBuf {
        self.dir.join("cars")
    }

    pub async fn ensure_dir(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(self.cars_dir()).await?;
        Ok(())
    }

    /// Fails once a request carries more than the configured number of files.
    pub fn check_count(&self, count: usize) -> Result<(), UploadError> {
        if count > self.max_files {
            return Err(UploadError::TooManyFiles {
                max: self.max_files,
            });
        }
        Ok(())
    }

    /// Validates one file and returns the lowercase extension to store it under.
    pub fn check(
        &self,
        file_name: &str,
        content_type: &str,
        size: usize,
    ) -> Result<String, UploadError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or(UploadError::UnsupportedType)?;
        if !ALLOWED_IMAGE_TYPES.contains(&ext.as_str()) {
            return Err(UploadError::UnsupportedType);
        }

        let subtype = content_type
            .trim()
            .to_lowercase()
            .strip_prefix("image/")
            .map(str::to_string)
            .ok_or(UploadError::UnsupportedType)?;
        if !ALLOWED_IMAGE_TYPES.contains(&subtype.as_str()) {
            return Err(UploadError::UnsupportedType);
        }

        if size > self.max_file_size {
            return Err(UploadError::TooLarge {
                max: self.max_file_size,
            });
        }
        Ok(ext)
    }

    /// Validates and writes one file. Returns its public URL.
    pub async fn save(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let ext = self.check(file_name, content_type, bytes.len())?;
        let stored_name = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext
        );
        self.ensure_dir().await?;
        tokio::fs::write(self.cars_dir().join(&stored_name), bytes).await?;
        info!(
            event_name = "uploads.stored",
            event_domain = "uploads",
            file = stored_name.as_str(),
            bytes = bytes.len(),
            "stored car photo"
        );
        Ok(format!("{}/{}", PUBLIC_PREFIX, stored_name))
    }

    /// Writes a batch. If any file fails, the ones already written are removed.
    pub async fn save_all(&self, files: &[PendingUpload]) -> Result<Vec<String>, UploadError> {
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            match self
                .save(&file.file_name, &file.content_type, &file.bytes)
                .await
            {
                Ok(url) => urls.push(url),
                Err(e) => {
                    self.discard(&urls).await;
                    return Err(e);
                }
            }
        }
        Ok(urls)
    }

    /// Removes stored files by public URL. Failures are logged only.
    pub async fn discard(&self, urls: &[String]) {
        for url in urls {
            let Some(stored_name) = url
                .strip_prefix(PUBLIC_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|name| !name.is_empty() && !name.contains(|c: char| c == '/' || c == '\\'))
            else {
                warn!("Not discarding unexpected upload URL '{}'", url);
                continue;
            };
            if let Err(e) = tokio::fs::remove_file(self.cars_dir().join(stored_name)).await {
                warn!(
                    event_name = "uploads.discard.failed",
                    event_domain = "uploads",
                    file = stored_name,
                    error = %e,
                    "could not remove stored car photo"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: PathBuf) -> UploadStore {
        UploadStore::new(&UploadConfig {
            dir,
            ..Default::default()
        })
    }

    #[test]
    fn test_png_accepted() {
        let uploads = store(PathBuf::from("unused"));
        assert_eq!(uploads.check("Photo.PNG", "image/png", 1024).unwrap(), "png");
        assert_eq!(uploads.check("a.jpg", "image/jpeg", 10).unwrap(), "jpg");
    }

    #[test]
    fn test_gif_rejected() {
        let uploads = store(PathBuf::from("unused"));
        assert!(matches!(
            uploads.check("anim.gif", "image/gif", 10),
            Err(UploadError::UnsupportedType)
        ));
        // Extension alone is not enough.
        assert!(matches!(
            uploads.check("fake.png", "application/pdf", 10),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            uploads.check("noext", "image/png", 10),
            Err(UploadError::UnsupportedType)
        ));
    }

    #[test]
    fn test_oversized_rejected() {
        let uploads = store(PathBuf::from("unused"));
        let limit = 5 * 1024 * 1024;
        assert!(uploads.check("a.webp", "image/webp", limit).is_ok());
        assert!(matches!(
            uploads.check("a.webp", "image/webp", limit + 1),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_file_count_limit() {
        let uploads = store(PathBuf::from("unused"));
        assert!(uploads.check_count(10).is_ok());
        assert!(matches!(
            uploads.check_count(11),
            Err(UploadError::TooManyFiles { max: 10 })
        ));
    }

    #[tokio::test]
    async fn test_save_writes_under_cars_dir() {
        let dir = std::env::temp_dir().join(format!("autosalon-uploads-{}", Uuid::new_v4()));
        let uploads = store(dir.clone());
        let url = uploads.save("car.png", "image/png", b"png-bytes").await.unwrap();
        assert!(url.starts_with("/uploads/cars/"));
        assert!(url.ends_with(".png"));

        let file_name = url.trim_start_matches("/uploads/cars/");
        let written = tokio::fs::read(dir.join("cars").join(file_name)).await.unwrap();
        assert_eq!(written, b"png-bytes");
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    async fn stored_files(dir: &Path) -> usize {
        let mut entries = tokio::fs::read_dir(dir.join("cars")).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    fn pending(file_name: &str, content_type: &str) -> PendingUpload {
        PendingUpload {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes: b"bytes".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_files() {
        let dir = std::env::temp_dir().join(format!("autosalon-uploads-{}", Uuid::new_v4()));
        let uploads = store(dir.clone());
        uploads.ensure_dir().await.unwrap();

        let batch = [
            pending("one.png", "image/png"),
            pending("two.jpg", "image/jpeg"),
            pending("three.gif", "image/gif"),
        ];
        let result = uploads.save_all(&batch).await;
        assert!(matches!(result, Err(UploadError::UnsupportedType)));
        assert_eq!(stored_files(&dir).await, 0);

        let urls = uploads.save_all(&batch[..2]).await.unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(stored_files(&dir).await, 2);

        uploads.discard(&urls).await;
        assert_eq!(stored_files(&dir).await, 0);
        // Already gone and foreign URLs are ignored.
        uploads.discard(&urls).await;
        uploads.discard(&["/etc/passwd".to_string()]).await;
        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
