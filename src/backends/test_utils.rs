//! Mock segmentation model for tests

use crate::error::Result;
use crate::inference::SegmentationModel;
use crate::models::ModelInfo;
use image::{DynamicImage, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic stand-in for a real model: keeps the left half of the image
/// opaque and makes the right half fully transparent.
pub struct MockSegmentationModel {
    info: ModelInfo,
    invocations: AtomicUsize,
}

impl MockSegmentationModel {
    pub fn new() -> Self {
        let mut info = ModelInfo::u2netp();
        info.id = "mock".to_string();
        info.description = "mock model (tests)".to_string();
        Self {
            info,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Number of times `remove_background` ran
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for MockSegmentationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut cutout = image.to_rgba8();
        let width = cutout.width();
        for (x, _, pixel) in cutout.enumerate_pixels_mut() {
            pixel[3] = if x < width / 2 { 255 } else { 0 };
        }
        Ok(cutout)
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_splits_alpha_and_counts() {
        let model = MockSegmentationModel::new();
        let image = DynamicImage::new_rgb8(4, 2);
        let cutout = model.remove_background(&image).unwrap();
        assert_eq!(cutout.get_pixel(0, 0)[3], 255);
        assert_eq!(cutout.get_pixel(3, 0)[3], 0);
        assert_eq!(model.invocations(), 1);
    }
}
