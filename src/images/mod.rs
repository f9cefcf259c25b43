//! Poster and thumbnail re-encoding for the image proxy.
//!
//! Images are optionally resized and re-encoded as JPEG. Anything that goes
//! wrong upstream or while decoding falls back to a bundled placeholder, so the
//! image proxy always answers 200.

use std::io::Cursor;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use anistream_core::{Error, Result};

/// Long-lived cache directive for proxied images.
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=604800, immutable";

/// Largest edge we are willing to resize to.
pub const MAX_DIMENSION: u32 = 2000;

/// Placeholder served when the real image cannot be produced.
pub static PLACEHOLDER_SVG: &[u8] = include_bytes!("../../assets/placeholder.svg");

/// Requested output size. `None` on both axes means "pass through".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl TargetSize {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        let clamp = |v: Option<u32>| v.filter(|v| *v > 0).map(|v| v.min(MAX_DIMENSION));
        Self {
            width: clamp(width),
            height: clamp(height),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Decode `data`, resize it to `size` and re-encode as JPEG.
///
/// A single dimension keeps the aspect ratio; both dimensions fill the box and
/// crop the overflow.
pub fn resize_to_jpeg(data: &[u8], size: TargetSize) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| Error::Validation(format!("undecodable image: {e}")))?;

    let resized = match (size.width, size.height) {
        (Some(w), Some(h)) => img.resize_to_fill(w, h, FilterType::Lanczos3),
        (Some(w), None) if img.width() > w => img.resize(w, u32::MAX, FilterType::Lanczos3),
        (None, Some(h)) if img.height() > h => img.resize(u32::MAX, h, FilterType::Lanczos3),
        _ => img,
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| Error::Internal(format!("failed to encode JPEG: {e}")))?;
    Ok(buf.into_inner())
}

/// 200 response carrying image bytes and the long cache directive.
pub fn image_response(content_type: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
        ],
        body,
    )
        .into_response()
}

/// 200 response carrying the placeholder.
pub fn placeholder_response() -> Response {
    image_response("image/svg+xml", PLACEHOLDER_SVG.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn dims(jpeg: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn width_only_keeps_aspect() {
        let out = resize_to_jpeg(&png(400, 200), TargetSize::new(Some(100), None)).unwrap();
        assert_eq!(dims(&out), (100, 50));
    }

    #[test]
    fn both_dimensions_fill_box() {
        let out = resize_to_jpeg(&png(400, 200), TargetSize::new(Some(50), Some(50))).unwrap();
        assert_eq!(dims(&out), (50, 50));
    }

    #[test]
    fn smaller_images_are_not_upscaled() {
        let out = resize_to_jpeg(&png(40, 20), TargetSize::new(Some(100), None)).unwrap();
        assert_eq!(dims(&out), (40, 20));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(resize_to_jpeg(b"not an image", TargetSize::new(Some(10), None)).is_err());
    }

    #[test]
    fn target_size_clamps() {
        let size = TargetSize::new(Some(0), Some(99_999));
        assert_eq!(size.width, None);
        assert_eq!(size.height, Some(MAX_DIMENSION));
        assert!(TargetSize::default().is_passthrough());
    }

    #[test]
    fn placeholder_is_svg() {
        let resp = placeholder_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/svg+xml");
        assert_eq!(
            resp.headers().get(header::CACHE_CONTROL).unwrap(),
            IMAGE_CACHE_CONTROL
        );
        assert!(std::str::from_utf8(PLACEHOLDER_SVG).unwrap().contains("<svg"));
    }
}
