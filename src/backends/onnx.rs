//! ONNX Runtime backend for segmentation models
//!
//! Runs the standard U²-Net-style pipeline: resize the bitmap to the model's
//! square input size, normalize to an NCHW `f32` tensor, run the graph, and
//! turn the single-channel saliency output back into an alpha channel at the
//! original resolution.

use crate::error::{RemovalError, Result};
use crate::inference::SegmentationModel;
use crate::models::ModelInfo;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbaImage};
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Segmentation model backed by an ONNX Runtime session
pub struct OnnxSession {
    // ort sessions take &mut self to run; requests are serialized here
    session: Mutex<Session>,
    info: ModelInfo,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("model", &self.info.id)
            .finish_non_exhaustive()
    }
}

impl OnnxSession {
    /// Load a model file into an ONNX Runtime session.
    ///
    /// GPU execution providers (CUDA, CoreML) are registered when available;
    /// ONNX Runtime falls back to CPU otherwise.
    pub fn load(model_path: &Path, info: ModelInfo, intra_threads: usize) -> Result<Self> {
        let mut providers = Vec::new();
        if OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false) {
            debug!("CUDA execution provider available");
            providers.push(CUDAExecutionProvider::default().build());
        }
        if OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default()).unwrap_or(false)
        {
            debug!("CoreML execution provider available");
            providers.push(CoreMLExecutionProvider::default().build());
        }

        let mut builder = Session::builder()
            .map_err(|e| RemovalError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RemovalError::model(format!("Failed to set optimization level: {e}")))?;

        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers).map_err(|e| {
                RemovalError::model(format!("Failed to register execution providers: {e}"))
            })?;
        }
        if intra_threads > 0 {
            builder = builder
                .with_intra_threads(intra_threads)
                .map_err(|e| RemovalError::model(format!("Failed to set thread count: {e}")))?;
        }

        let session = builder.commit_from_file(model_path).map_err(|e| {
            RemovalError::model(format!(
                "Failed to load model '{}': {e}",
                model_path.display()
            ))
        })?;

        info!(model = %info.id, path = %model_path.display(), "ONNX session created");
        Ok(Self {
            session: Mutex::new(session),
            info,
        })
    }

    /// Resize and normalize a bitmap into the NCHW tensor the graph expects
    fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let size = self.info.target_size;
        let rgb = image.to_rgb8();
        let resized = image::imageops::resize(&rgb, size, size, FilterType::Triangle);

        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                tensor[[0, c, y as usize, x as usize]] =
                    (value - self.info.mean[c]) / self.info.std[c];
            }
        }
        tensor
    }

    /// Run the graph and return the first output as a 4D tensor
    fn run_inference(&self, input: Array4<f32>) -> Result<Array4<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| RemovalError::processing("ONNX session lock poisoned"))?;

        let input_value = Value::from_array(input)
            .map_err(|e| RemovalError::processing(format!("Failed to convert input tensor: {e}")))?;

        // Positional inputs/outputs: no dependency on tensor names
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| RemovalError::processing(format!("ONNX inference failed: {e}")))?;

        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| RemovalError::processing("No output tensors found"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| RemovalError::processing("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| {
                RemovalError::processing(format!("Failed to extract output tensor: {e}"))
            })?;

        let shape = output_tensor.shape().to_vec();
        if shape.len() != 4 {
            return Err(RemovalError::processing(format!(
                "Expected 4D output tensor, got {}D",
                shape.len()
            )));
        }
        let data = output_tensor.view().to_owned();
        Array4::from_shape_vec(
            (shape[0], shape[1], shape[2], shape[3]),
            data.into_raw_vec_and_offset().0,
        )
        .map_err(|e| RemovalError::processing(format!("Failed to reshape output tensor: {e}")))
    }

    /// Min-max normalize the mask and scale it back to the input dimensions
    fn mask_to_alpha(&self, output: &Array4<f32>, width: u32, height: u32) -> Result<GrayImage> {
        let mask_height = output.dim().2;
        let mask_width = output.dim().3;

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in output.iter() {
            min = min.min(v);
            max = max.max(v);
        }
        let range = if max > min { max - min } else { 1.0 };

        let mut mask = GrayImage::new(mask_width as u32, mask_height as u32);
        for y in 0..mask_height {
            for x in 0..mask_width {
                let normalized = (output[[0, 0, y, x]] - min) / range;
                mask.put_pixel(
                    x as u32,
                    y as u32,
                    image::Luma([(normalized * 255.0).round().clamp(0.0, 255.0) as u8]),
                );
            }
        }

        Ok(image::imageops::resize(
            &mask,
            width,
            height,
            FilterType::Triangle,
        ))
    }
}

impl SegmentationModel for OnnxSession {
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let mut cutout = image.to_rgba8();
        let (width, height) = cutout.dimensions();
        debug!(width, height, model = %self.info.id, "Running segmentation");

        let tensor = self.preprocess(image);
        let output = self.run_inference(tensor)?;
        let alpha = self.mask_to_alpha(&output, width, height)?;

        for (x, y, pixel) in cutout.enumerate_pixels_mut() {
            pixel[3] = alpha.get_pixel(x, y)[0];
        }
        Ok(cutout)
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}
