//! Process-wide model session
//!
//! [`ModelSession`] owns the single [`SegmentationModel`] instance shared by
//! all requests. Initialization is lazy but guarded by a `tokio` `OnceCell`:
//! concurrent first requests await one initialization instead of racing to
//! load the weights twice. A failed initialization leaves the cell empty, so
//! the next request retries rather than pinning the process to a dead model.

use crate::config::ServerConfig;
use crate::error::{RemovalError, Result};
use crate::inference::SegmentationModel;
use image::{DynamicImage, RgbaImage};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

type SharedModel = Arc<dyn SegmentationModel>;
type ModelFuture = Pin<Box<dyn Future<Output = Result<SharedModel>> + Send>>;
type ModelFactory = Box<dyn Fn() -> ModelFuture + Send + Sync>;

/// Lazily-initialized, process-lifetime handle to the segmentation model
pub struct ModelSession {
    factory: ModelFactory,
    cell: OnceCell<SharedModel>,
    model_id: String,
}

impl std::fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSession")
            .field("model_id", &self.model_id)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl ModelSession {
    /// Session backed by the configured ONNX model.
    ///
    /// Nothing is loaded until the first request; the factory downloads the
    /// model file if needed and builds the ONNX session off the event loop.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let spec = config.model.clone();
        let intra_threads = config.intra_threads;
        let model_id = spec.info.id.clone();

        let factory: ModelFactory = Box::new(move || {
            let spec = spec.clone();
            Box::pin(async move {
                info!(model = %spec.info.id, "Initializing segmentation model (first use)");
                let downloader = crate::download::ModelDownloader::new()?;
                let model_path = downloader.ensure_model(&spec).await?;

                #[cfg(feature = "onnx")]
                {
                    let info = spec.info.clone();
                    let model = tokio::task::spawn_blocking(move || {
                        crate::backends::OnnxSession::load(&model_path, info, intra_threads)
                    })
                    .await
                    .map_err(|e| {
                        RemovalError::model(format!("Model initialization panicked: {e}"))
                    })??;
                    info!(model = %spec.info.id, "Segmentation model ready");
                    Ok(Arc::new(model) as SharedModel)
                }
                #[cfg(not(feature = "onnx"))]
                {
                    let _ = (model_path, intra_threads);
                    Err(RemovalError::model(
                        "No inference backend compiled in (enable the `onnx` feature)",
                    ))
                }
            })
        });

        Self {
            factory,
            cell: OnceCell::new(),
            model_id,
        }
    }

    /// Session with a custom initialization factory (used by tests to count
    /// initializations and by embedders supplying their own backend)
    pub fn with_factory<S: Into<String>>(model_id: S, factory: ModelFactory) -> Self {
        Self {
            factory,
            cell: OnceCell::new(),
            model_id: model_id.into(),
        }
    }

    /// Session wrapping an already-constructed model
    pub fn preloaded(model: SharedModel) -> Self {
        let model_id = model.model_info().id.clone();
        Self {
            factory: Box::new(|| {
                Box::pin(async { Err(RemovalError::model("Session already initialized")) })
            }),
            cell: OnceCell::new_with(Some(model)),
            model_id,
        }
    }

    /// Get the shared model, initializing it on first use
    pub async fn model(&self) -> Result<SharedModel> {
        self.cell
            .get_or_try_init(|| (self.factory)())
            .await
            .cloned()
    }

    /// Whether the model has finished initializing
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Identifier of the configured model
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Run background removal on a blocking worker thread.
    ///
    /// Inference is CPU-bound; offloading it keeps heavy requests from
    /// stalling concurrent request handling on the event loop.
    pub async fn remove_background(&self, image: DynamicImage) -> Result<RgbaImage> {
        let model = self.model().await?;
        tokio::task::spawn_blocking(move || model.remove_background(&image))
            .await
            .map_err(|e| RemovalError::processing(format!("Inference task panicked: {e}")))?
    }
}
