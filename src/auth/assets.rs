use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::auth::{AuthError, AuthResult};

/// Result of a successful media upload. `duration` is only populated for
/// time-based media (the upstream service reports it for video/audio).
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub duration: Option<f64>,
}

/// External media storage consumed at registration for avatar and cover
/// images. `Ok(None)` signals a failed upload (missing file, upstream
/// rejection); the caller decides whether that is fatal.
#[rocket::async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, local_path: &str) -> AuthResult<Option<UploadedAsset>>;
}

/// Configuration for the HTTP-backed asset store.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub upload_url: String,
    pub api_key: String,
}

impl AssetConfig {
    pub fn from_env() -> AuthResult<Self> {
        let upload_url = std::env::var("VIDTUBE_ASSET_UPLOAD_URL")
            .map_err(|_| AuthError::Config("VIDTUBE_ASSET_UPLOAD_URL is required".into()))?;
        let api_key = std::env::var("VIDTUBE_ASSET_API_KEY")
            .map_err(|_| AuthError::Config("VIDTUBE_ASSET_API_KEY is required".into()))?;
        Ok(Self {
            upload_url,
            api_key,
        })
    }
}

/// Production store: ships the local file to the media service and returns
/// its hosted URL.
pub struct HttpAssetStore {
    client: reqwest::Client,
    config: AssetConfig,
}

impl HttpAssetStore {
    pub fn new(config: AssetConfig) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| AuthError::Asset(err.to_string()))?;
        Ok(Self { client, config })
    }
}

#[rocket::async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(&self, local_path: &str) -> AuthResult<Option<UploadedAsset>> {
        if local_path.is_empty() {
            return Ok(None);
        }

        // An unreadable local file is an upload failure, not a server error.
        let bytes = match tokio::fs::read(local_path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("asset upload skipped, cannot read {}: {}", local_path, err);
                return Ok(None);
            }
        };

        let file_name = Path::new(local_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload");

        let response = self
            .client
            .post(&self.config.upload_url)
            .bearer_auth(&self.config.api_key)
            .query(&[("filename", file_name)])
            .body(bytes)
            .send()
            .await
            .map_err(|err| AuthError::Asset(err.to_string()))?;

        if !response.status().is_success() {
            log::warn!(
                "asset upload rejected for {}: {}",
                file_name,
                response.status()
            );
            return Ok(None);
        }

        let asset = response
            .json::<UploadedAsset>()
            .await
            .map_err(|err| AuthError::Asset(err.to_string()))?;

        Ok(Some(asset))
    }
}

/// In-memory store for tests: uploads succeed with a deterministic URL
/// unless the path has been registered as failing.
#[derive(Default)]
pub struct MemoryAssetStore {
    failing_paths: Mutex<HashSet<String>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_path(&self, path: &str) {
        self.failing_paths.lock().insert(path.to_string());
    }
}

#[rocket::async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upload(&self, local_path: &str) -> AuthResult<Option<UploadedAsset>> {
        if local_path.is_empty() || self.failing_paths.lock().contains(local_path) {
            return Ok(None);
        }

        let file_name = Path::new(local_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload");

        Ok(Some(UploadedAsset {
            url: format!("https://assets.test/{file_name}"),
            duration: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_uploads_and_fails_on_registered_paths() {
        let store = MemoryAssetStore::new();

        let asset = store
            .upload("/tmp/avatar.png")
            .await
            .expect("upload runs")
            .expect("upload succeeds");
        assert_eq!(asset.url, "https://assets.test/avatar.png");

        store.fail_path("/tmp/broken.png");
        assert!(store.upload("/tmp/broken.png").await.expect("upload runs").is_none());
        assert!(store.upload("").await.expect("upload runs").is_none());
    }
}
