//! Inference backend implementations
//!
//! The service currently ships a single backend: ONNX Runtime via `ort`.
//! Everything else in the crate depends only on the
//! [`crate::inference::SegmentationModel`] trait, so additional backends can
//! be added without touching the HTTP layer.

#[cfg(feature = "onnx")]
pub mod onnx;

// Test utilities for exercising the pipeline without model weights
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxSession;
