//! Room-photo loading, resizing, and base64 encoding.
//!
//! Every upload is normalized here before it enters the session: decoded,
//! size-checked, downscaled, and re-encoded as JPEG so the gateway always
//! ships a predictable payload regardless of what the user dropped in.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::info;

/// Maximum dimension (width or height) for images sent to the model.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// Minimum dimension for a usable room photo.
pub const MIN_IMAGE_DIMENSION: u32 = 200;

use super::types::ImagePart;

/// Normalize an uploaded room photo into an [`ImagePart`].
///
/// # Errors
/// - The bytes cannot be decoded as an image
/// - The image is smaller than 200 px on its shortest side
pub fn prepare_upload(image_bytes: &[u8]) -> Result<ImagePart, String> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| format!("Could not read that image: {}. Use a JPEG, PNG, or WebP file.", e))?;

    let (width, height) = (img.width(), img.height());
    info!("Loaded room photo: {}x{}", width, height);

    let min_side = width.min(height);
    if min_side < MIN_IMAGE_DIMENSION {
        return Err(format!(
            "Image too small to work with: {}x{}. Minimum dimension is {}px.",
            width, height, MIN_IMAGE_DIMENSION
        ));
    }

    let resized = resize_if_needed(img, MAX_IMAGE_DIMENSION);
    info!("Prepared at: {}x{}", resized.width(), resized.height());

    let jpeg_bytes = encode_to_jpeg(&resized)?;

    Ok(ImagePart {
        mime_type: "image/jpeg".to_string(),
        data: STANDARD.encode(&jpeg_bytes),
    })
}

/// Resize if either dimension exceeds max, maintaining aspect ratio.
fn resize_if_needed(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= max_dimension && height <= max_dimension {
        return img;
    }

    let scale = max_dimension as f32 / width.max(height) as f32;
    let new_width = (width as f32 * scale) as u32;
    let new_height = (height as f32 * scale) as u32;

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

fn encode_to_jpeg(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to encode image: {}", e))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_prepare_upload_rejects_too_small() {
        let result = prepare_upload(&png_bytes(50, 50));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("too small"));
    }

    #[test]
    fn test_prepare_upload_rejects_invalid() {
        let result = prepare_upload(b"not an image");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Could not read"));
    }

    #[test]
    fn test_prepare_upload_normalizes_to_jpeg() {
        let part = prepare_upload(&png_bytes(300, 300)).unwrap();
        assert_eq!(part.mime_type, "image/jpeg");

        let decoded = STANDARD.decode(&part.data).unwrap();
        // JPEG magic bytes
        assert_eq!(decoded[0], 0xFF);
        assert_eq!(decoded[1], 0xD8);
    }

    #[test]
    fn test_resize_if_needed_no_resize() {
        let img = DynamicImage::new_rgb8(500, 300);
        let resized = resize_if_needed(img, 1024);
        assert_eq!(resized.width(), 500);
        assert_eq!(resized.height(), 300);
    }

    #[test]
    fn test_resize_if_needed_landscape() {
        let img = DynamicImage::new_rgb8(2048, 1024);
        let resized = resize_if_needed(img, 1024);
        assert_eq!(resized.width(), 1024);
        assert_eq!(resized.height(), 512);
    }

    #[test]
    fn test_resize_if_needed_portrait() {
        let img = DynamicImage::new_rgb8(1000, 2000);
        let resized = resize_if_needed(img, 1024);
        assert_eq!(resized.width(), 512);
        assert_eq!(resized.height(), 1024);
    }
}
