//! Saving rendered frames as images.

use image::{ImageBuffer, Rgba};
use std::path::Path;

/// Channel order of 8-bit pixel data read back from a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba,
    Bgra,
}

impl PixelLayout {
    /// Layout for a target format, or `None` when it is not 8-bit four-channel.
    pub fn from_format(format: wgpu::TextureFormat) -> Option<Self> {
        use wgpu::TextureFormat as F;
        match format {
            F::Rgba8Unorm | F::Rgba8UnormSrgb => Some(Self::Rgba),
            F::Bgra8Unorm | F::Bgra8UnormSrgb => Some(Self::Bgra),
            _ => None,
        }
    }
}

fn to_image(
    data: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    let mut rgba_data = data.to_vec();
    if layout == PixelLayout::Bgra {
        for chunk in rgba_data.chunks_exact_mut(4) {
            chunk.swap(0, 2); // Swap B and R
        }
    }

    // Note: wgpu uses top-left origin, so no vertical flip needed
    ImageBuffer::from_raw(width, height, rgba_data).ok_or(ScreenshotError::InvalidImageData)
}

/// Saves tightly packed 8-bit pixel data to an image file.
///
/// The format follows the extension: `.png`, `.jpg` or `.jpeg`.
pub fn save_image(
    filename: impl AsRef<Path>,
    data: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<(), ScreenshotError> {
    let path = filename.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(data, width, height, layout)?;

    match extension.as_str() {
        "png" => {
            img.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // Convert to RGB for JPEG (no alpha)
            let rgb_img = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    Ok(())
}

/// Encodes tightly packed 8-bit pixel data as PNG in memory.
pub fn save_to_buffer(
    data: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image(data, width, height, layout)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_format() {
        assert_eq!(
            PixelLayout::from_format(wgpu::TextureFormat::Bgra8UnormSrgb),
            Some(PixelLayout::Bgra)
        );
        assert_eq!(
            PixelLayout::from_format(wgpu::TextureFormat::Rgba8Unorm),
            Some(PixelLayout::Rgba)
        );
        assert_eq!(PixelLayout::from_format(wgpu::TextureFormat::Rgba16Float), None);
    }

    #[test]
    fn test_png_roundtrip_swaps_bgra() {
        let bgra = [10, 20, 30, 255, 40, 50, 60, 128];
        let png = save_to_buffer(&bgra, 2, 1, PixelLayout::Bgra).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [30, 20, 10, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [60, 50, 40, 128]);
    }

    #[test]
    fn test_invalid_data() {
        assert!(matches!(
            save_to_buffer(&[0; 7], 2, 1, PixelLayout::Rgba),
            Err(ScreenshotError::InvalidImageData)
        ));
        assert!(matches!(
            save_image("frame.bmp", &[0; 4], 1, 1, PixelLayout::Rgba),
            Err(ScreenshotError::UnsupportedFormat(_))
        ));
    }
}
