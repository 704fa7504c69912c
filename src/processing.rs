//! Image decode, compositing, and encode steps
//!
//! Pure functions between the HTTP surface and the model: decode request
//! payloads into bitmaps, optionally flatten the transparent cutout onto a
//! solid background color, and encode the final bitmap for the response.

use crate::error::{RemovalError, Result};
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageBuffer, RgbImage, RgbaImage};
use std::io::Cursor;

/// Output encodings the service produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// PNG, preserves the alpha channel
    Png,
    /// JPEG quality 95, used once a background color removed all transparency
    Jpeg,
}

impl OutputFormat {
    /// Media type for the HTTP response
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Caller-supplied solid background fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl BackgroundColor {
    /// Parse the `bgcolor` request field: an array of 3 (RGB) or 4 (RGBA)
    /// integers. Fewer than 3 entries means no compositing; out-of-range
    /// values clamp to the u8 range. A missing alpha defaults to opaque.
    #[must_use]
    pub fn from_request(values: Option<&[i64]>) -> Option<Self> {
        let values = values?;
        if values.len() < 3 {
            return None;
        }
        let clamp = |v: i64| -> u8 { v.clamp(0, 255) as u8 };
        Some(Self {
            r: clamp(values[0]),
            g: clamp(values[1]),
            b: clamp(values[2]),
            a: values.get(3).copied().map_or(255, clamp),
        })
    }
}

/// Decode raw bytes into a bitmap
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| RemovalError::decode(format!("Invalid image: {e}")))
}

/// Decode a base64 image payload, tolerating `data:image/...;base64,` prefixes
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    let data = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| RemovalError::decode(format!("Invalid base64: {e}")))
}

/// Alpha-composite a cutout over a solid background color and flatten to RGB.
///
/// Standard `over` operator per channel: `out = fg*a + bg*(1-a)`, computed in
/// integer math with rounding. The result is opaque, so alpha is dropped.
#[must_use]
pub fn composite_over_color(foreground: &RgbaImage, color: BackgroundColor) -> RgbImage {
    let (width, height) = foreground.dimensions();
    // The background itself may carry alpha; pre-blend it against black the
    // way PIL's alpha_composite treats a non-opaque backdrop layer.
    let bg = [
        blend_channel(color.r, 0, color.a),
        blend_channel(color.g, 0, color.a),
        blend_channel(color.b, 0, color.a),
    ];

    let mut output: RgbImage = ImageBuffer::new(width, height);
    for (x, y, pixel) in foreground.enumerate_pixels() {
        let alpha = pixel[3];
        output.put_pixel(
            x,
            y,
            image::Rgb([
                blend_channel(pixel[0], bg[0], alpha),
                blend_channel(pixel[1], bg[1], alpha),
                blend_channel(pixel[2], bg[2], alpha),
            ]),
        );
    }
    output
}

/// `fg*a + bg*(255-a)` with round-to-nearest in u16 math
fn blend_channel(fg: u8, bg: u8, alpha: u8) -> u8 {
    let fg = u16::from(fg);
    let bg = u16::from(bg);
    let a = u16::from(alpha);
    ((fg * a + bg * (255 - a) + 127) / 255) as u8
}

/// Encode a bitmap to the requested output format
pub fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    match format {
        OutputFormat::Png => {
            image.write_with_encoder(PngEncoder::new(&mut cursor))?;
        },
        OutputFormat::Jpeg => {
            // JPEG has no alpha; encode from RGB
            let rgb = image.to_rgb8();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut cursor, jpeg_quality))?;
        },
    }
    Ok(buffer)
}

/// Apply the optional compositing step and pick the output format.
///
/// With a fill color the cutout is flattened and re-encoded as JPEG; without
/// one the transparent PNG passes through untouched.
pub fn finalize_cutout(
    cutout: RgbaImage,
    bgcolor: Option<BackgroundColor>,
    jpeg_quality: u8,
) -> Result<(Vec<u8>, OutputFormat)> {
    match bgcolor {
        Some(color) => {
            let flattened = composite_over_color(&cutout, color);
            let bytes = encode_image(
                &DynamicImage::ImageRgb8(flattened),
                OutputFormat::Jpeg,
                jpeg_quality,
            )?;
            Ok((bytes, OutputFormat::Jpeg))
        },
        None => {
            let bytes = encode_image(
                &DynamicImage::ImageRgba8(cutout),
                OutputFormat::Png,
                jpeg_quality,
            )?;
            Ok((bytes, OutputFormat::Png))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker_cutout() -> RgbaImage {
        // 2x2: opaque red, transparent, half-transparent green, opaque blue
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 1, Rgba([0, 255, 0, 128]));
        img.put_pixel(1, 1, Rgba([0, 0, 255, 255]));
        img
    }

    #[test]
    fn test_bgcolor_parsing() {
        assert_eq!(
            BackgroundColor::from_request(Some(&[255, 255, 255])),
            Some(BackgroundColor {
                r: 255,
                g: 255,
                b: 255,
                a: 255
            })
        );
        assert_eq!(
            BackgroundColor::from_request(Some(&[10, 20, 30, 40])),
            Some(BackgroundColor {
                r: 10,
                g: 20,
                b: 30,
                a: 40
            })
        );
        // Too few entries: ignored, matching the original API's guard
        assert_eq!(BackgroundColor::from_request(Some(&[1, 2])), None);
        assert_eq!(BackgroundColor::from_request(None), None);
        // Out-of-range values clamp
        assert_eq!(
            BackgroundColor::from_request(Some(&[-5, 300, 128])),
            Some(BackgroundColor {
                r: 0,
                g: 255,
                b: 128,
                a: 255
            })
        );
    }

    #[test]
    fn test_transparent_pixels_become_background_color() {
        let white = BackgroundColor {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        };
        let flattened = composite_over_color(&checker_cutout(), white);
        assert_eq!(flattened.get_pixel(1, 0), &image::Rgb([255, 255, 255]));
        // Opaque pixels are untouched
        assert_eq!(flattened.get_pixel(0, 0), &image::Rgb([255, 0, 0]));
        assert_eq!(flattened.get_pixel(1, 1), &image::Rgb([0, 0, 255]));
    }

    #[test]
    fn test_half_transparent_pixel_blends() {
        let white = BackgroundColor {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        };
        let flattened = composite_over_color(&checker_cutout(), white);
        let px = flattened.get_pixel(0, 1);
        // fg=(0,255,0) a=128 over white: r = 255*127/255, g = 255, b = r
        assert_eq!(px[1], 255);
        assert_eq!(px[0], px[2]);
        assert!((120..=130).contains(&px[0]));
    }

    #[test]
    fn test_blend_channel_boundaries() {
        assert_eq!(blend_channel(200, 10, 255), 200);
        assert_eq!(blend_channel(200, 10, 0), 10);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, RemovalError::Decode(_)));
    }

    #[test]
    fn test_base64_roundtrip_and_data_url() {
        let png = encode_image(
            &DynamicImage::ImageRgba8(checker_cutout()),
            OutputFormat::Png,
            95,
        )
        .unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);

        let decoded = decode_base64_payload(&encoded).unwrap();
        assert_eq!(decoded, png);

        let data_url = format!("data:image/png;base64,{encoded}");
        assert_eq!(decode_base64_payload(&data_url).unwrap(), png);

        assert!(decode_base64_payload("!!not base64!!").is_err());
    }

    #[test]
    fn test_finalize_without_bgcolor_is_png_with_alpha() {
        let (bytes, format) = finalize_cutout(checker_cutout(), None, 95).unwrap();
        assert_eq!(format, OutputFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn test_finalize_with_bgcolor_is_jpeg_same_dims() {
        let color = BackgroundColor::from_request(Some(&[255, 255, 255])).unwrap();
        let (bytes, format) = finalize_cutout(checker_cutout(), Some(color), 95).unwrap();
        assert_eq!(format, OutputFormat::Jpeg);
        assert_eq!(format.content_type(), "image/jpeg");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 2));
    }
}
