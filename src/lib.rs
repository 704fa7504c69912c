#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Removal Server
//!
//! An HTTP service that removes image backgrounds using pretrained ONNX
//! segmentation models. Images arrive as multipart uploads, remote URLs, or
//! base64 payloads; the service returns a transparent PNG, or an opaque JPEG
//! when the caller asks for the cutout to be flattened onto a solid color.
//!
//! ## Endpoints
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | GET | `/` | — |
//! | GET | `/health` | — |
//! | POST | `/api/remove-bg` | multipart `file` field |
//! | POST | `/api/remove-bg-from-url` | JSON `{image_url, bgcolor?}` |
//! | POST | `/api/remove-bg-base64` | JSON `{image_base64, bgcolor?}` |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bgremove_server::{config::ServerConfig, server};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Bundled u2netp model, downloaded and cached on first request
//! let config = ServerConfig::builder().port(8000).build()?;
//! server::run(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The model loads lazily on the first removal request and is shared across
//! all requests for the process lifetime; see [`session::ModelSession`].
//!
//! ## Feature flags
//!
//! - `onnx` (default): ONNX Runtime inference backend
//! - `cli` (default): the `bgremove-server` binary (clap, tracing output)

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod processing;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use error::{RemovalError, Result};
pub use inference::SegmentationModel;
pub use models::{ModelInfo, ModelSource, ModelSpec};
pub use session::ModelSession;
