//! Segmentation model metadata and specification
//!
//! Describes where a model comes from (bundled download URL or local file)
//! and the preprocessing parameters its graph expects. The service only ever
//! talks to a model through the [`crate::inference::SegmentationModel`] trait;
//! this module carries the static facts needed to load one.

use crate::error::{RemovalError, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Default model downloaded on first use when none is configured.
///
/// u2netp is the lightweight (~4.7 MB) variant of U²-Net, the same model the
/// service has always shipped with.
pub const DEFAULT_MODEL_ID: &str = "u2netp";

const DEFAULT_MODEL_URL: &str =
    "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2netp.onnx";

/// Static description of a segmentation model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Short identifier, e.g. `u2netp`
    pub id: String,
    /// Human-readable description shown in health responses
    pub description: String,
    /// Square input size the graph expects (width == height)
    pub target_size: u32,
    /// Per-channel normalization mean (RGB order)
    pub mean: [f32; 3],
    /// Per-channel normalization standard deviation (RGB order)
    pub std: [f32; 3],
}

impl ModelInfo {
    /// Metadata for the bundled default model
    #[must_use]
    pub fn u2netp() -> Self {
        Self {
            id: DEFAULT_MODEL_ID.to_string(),
            description: "u2netp (lightweight 4.7MB)".to_string(),
            target_size: 320,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

/// Where to obtain the ONNX graph for a model
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Download from a URL into the cache directory (first use only)
    Download {
        /// HTTPS URL of the `.onnx` file
        url: String,
        /// Expected SHA-256 digest, verified after download when known
        sha256: Option<String>,
    },
    /// Use an `.onnx` file already on disk
    File(PathBuf),
}

/// Full model specification: source plus preprocessing metadata
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub source: ModelSource,
    pub info: ModelInfo,
}

impl ModelSpec {
    /// Specification for the bundled default model
    #[must_use]
    pub fn default_model() -> Self {
        Self {
            source: ModelSource::Download {
                url: DEFAULT_MODEL_URL.to_string(),
                sha256: None,
            },
            info: ModelInfo::u2netp(),
        }
    }

    /// Parse a CLI model argument into a specification.
    ///
    /// URLs become download sources; anything else is treated as a local
    /// file path and must exist. Preprocessing metadata falls back to the
    /// u2netp defaults, which cover the U²-Net model family.
    pub fn parse(arg: &str) -> Result<Self> {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            let mut info = ModelInfo::u2netp();
            info.id = model_id_from_url(arg);
            return Ok(Self {
                source: ModelSource::Download {
                    url: arg.to_string(),
                    sha256: None,
                },
                info,
            });
        }

        let path = PathBuf::from(arg);
        if !path.exists() {
            return Err(RemovalError::invalid_config(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let mut info = ModelInfo::u2netp();
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            info.id = stem.to_string();
        }
        Ok(Self {
            source: ModelSource::File(path),
            info,
        })
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::default_model()
    }
}

/// Derive a cache-friendly model id from a download URL
fn model_id_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .and_then(|name| name.strip_suffix(".onnx"))
        .unwrap_or(DEFAULT_MODEL_ID)
        .to_string()
}
