use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::ApiError;

/// Binary object store for employee photos. The returned URL is treated
/// as opaque everywhere else.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn store(&self, bytes: &[u8], nome_arquivo: &str) -> Result<String, ApiError>;
}

/// Writes photos to a local directory served under a public base URL.
pub struct DiskPhotoStore {
    dir: PathBuf,
    base_url: String,
}

impl DiskPhotoStore {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: PathBuf::from(&config.photo_dir),
            base_url: config.photo_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PhotoStore for DiskPhotoStore {
    async fn store(&self, bytes: &[u8], nome_arquivo: &str) -> Result<String, ApiError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ApiError::Upstream(format!("photo store: {}", e)))?;

        let path = self.dir.join(nome_arquivo);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::Upstream(format!("photo store: {}", e)))?;

        Ok(format!("{}/{}", self.base_url, nome_arquivo))
    }
}
