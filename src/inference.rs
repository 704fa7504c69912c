//! Segmentation model abstraction
//!
//! The single seam between the HTTP adapter and whatever actually classifies
//! pixels. Everything above this trait treats the model as a black box that
//! turns an image into the same image with a foreground alpha channel.

use crate::error::Result;
use crate::models::ModelInfo;
use image::{DynamicImage, RgbaImage};

/// A loaded segmentation model
///
/// Implementations are shared across requests behind an `Arc` and invoked
/// from blocking worker threads, so they must be `Send + Sync`.
pub trait SegmentationModel: Send + Sync {
    /// Remove the background from an image.
    ///
    /// Returns an RGBA image with identical width and height whose alpha
    /// channel marks foreground (opaque) versus background (transparent).
    ///
    /// # Errors
    /// - Inference failures inside the backend
    /// - Tensor conversion or shape mismatches
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage>;

    /// Metadata for the loaded model
    fn model_info(&self) -> &ModelInfo;
}
