//! Model downloading and caching
//!
//! Resolves a [`ModelSpec`] to an `.onnx` file on disk. Download sources are
//! fetched once into a per-user cache directory and reused on later startups.
//! Downloads are written to a temporary file and renamed into place so a
//! crashed download never leaves a half-written model behind.

use crate::error::{RemovalError, Result};
use crate::models::{ModelSource, ModelSpec};
use futures_util::TryStreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

/// Downloads model files and manages the on-disk model cache
#[derive(Debug, Clone)]
pub struct ModelDownloader {
    client: Client,
    cache_dir: PathBuf,
}

impl ModelDownloader {
    /// Create a downloader using the platform cache directory
    /// (e.g. `~/.cache/bgremove-server/models` on Linux)
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| RemovalError::model("Could not determine cache directory"))?
            .join("bgremove-server")
            .join("models");
        Ok(Self::with_cache_dir(cache_dir))
    }

    /// Create a downloader with an explicit cache directory
    #[must_use]
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            cache_dir,
        }
    }

    /// Path a cached model file would occupy
    #[must_use]
    pub fn cached_path(&self, model_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{model_id}.onnx"))
    }

    /// Resolve a model specification to a local file, downloading if needed.
    ///
    /// Local-file sources are returned as-is. Download sources hit the cache
    /// first; a miss streams the file from its URL, optionally verifying the
    /// SHA-256 digest before the file becomes visible under its final name.
    pub async fn ensure_model(&self, spec: &ModelSpec) -> Result<PathBuf> {
        match &spec.source {
            ModelSource::File(path) => {
                if !path.exists() {
                    return Err(RemovalError::model(format!(
                        "Model file not found: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            },
            ModelSource::Download { url, sha256 } => {
                let dest = self.cached_path(&spec.info.id);
                if dest.exists() {
                    info!(model = %spec.info.id, path = %dest.display(), "Using cached model");
                    return Ok(dest);
                }
                self.download_file(url, &dest, sha256.as_deref()).await?;
                Ok(dest)
            },
        }
    }

    async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        info!(url, dest = %dest.display(), "Downloading model");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemovalError::model(format!("Model download failed: {e}")))?;
        if !response.status().is_success() {
            return Err(RemovalError::model(format!(
                "Model download failed: HTTP {} from {url}",
                response.status()
            )));
        }

        // Stream to a temp file next to the destination, then rename.
        let tmp = dest.with_extension("onnx.tmp");
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let mut file = tokio::fs::File::create(&tmp).await?;
        let bytes_written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        drop(file);

        let digest = sha256_file(&tmp).await?;
        if let Some(expected) = expected_sha256 {
            if !digest.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(RemovalError::model(format!(
                    "Model checksum mismatch for {url}: expected {expected}, got {digest}"
                )));
            }
        } else {
            warn!(sha256 = %digest, "No expected checksum configured; accepting download as-is");
        }

        tokio::fs::rename(&tmp, dest).await?;
        info!(
            bytes = bytes_written,
            sha256 = %digest,
            path = %dest.display(),
            "Model downloaded"
        );
        Ok(())
    }
}

/// SHA-256 digest of a file, hex encoded
async fn sha256_file(path: &Path) -> Result<String> {
    let data = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
