// blazing-webp/src/processors/compressor.rs
use crate::core::{ConvertError, Result};
use image::DynamicImage;
use std::borrow::Cow;
use std::path::Path;

/// Largest width or height a WebP bitstream can describe.
pub const WEBP_MAX_DIMENSION: u32 = 16_383;

pub struct Compressor {
    quality: u8,
    lossless: bool,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100),
            lossless: false,
        }
    }

    pub fn lossless() -> Self {
        Self {
            quality: 100,
            lossless: true,
        }
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }

    pub fn compress_to_bytes(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        if image.width() > WEBP_MAX_DIMENSION || image.height() > WEBP_MAX_DIMENSION {
            return Err(ConvertError::CodecFailure(format!(
                "Image {}x{} exceeds the WebP limit of {} pixels per side",
                image.width(),
                image.height(),
                WEBP_MAX_DIMENSION
            )));
        }

        let image = Self::as_encodable(image);

        log::debug!(
            "Encoding {}x{} WebP, lossless: {}, quality: {}",
            image.width(),
            image.height(),
            self.lossless,
            self.quality
        );

        let encoder = webp::Encoder::from_image(&image)
            .map_err(|e| ConvertError::CodecFailure(format!("Image can't be converted: {}", e)))?;
        let encoded = encoder
            .encode_simple(self.lossless, self.quality as f32)
            .map_err(|e| ConvertError::CodecFailure(format!("Image can't be converted: {:?}", e)))?;

        Ok(encoded.to_vec())
    }

    /// Encode `image` and write it to `path`, returning the written size.
    pub fn save(&self, image: &DynamicImage, path: &Path) -> Result<u64> {
        let data = self.compress_to_bytes(image)?;

        if let Err(e) = std::fs::write(path, &data) {
            // Don't leave a truncated file behind
            let _ = std::fs::remove_file(path);
            return Err(ConvertError::CodecFailure(format!(
                "File can't be saved to {}: {}",
                path.display(),
                e
            )));
        }

        let file_size = std::fs::metadata(path)?.len();
        log::info!("Saved image: {} ({} bytes)", path.display(), file_size);
        Ok(file_size)
    }

    // libwebp only takes 8-bit RGB or RGBA
    fn as_encodable(image: &DynamicImage) -> Cow<'_, DynamicImage> {
        match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
            _ if image.color().has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        }
    }

    pub fn calculate_savings(&self, original_size: u64, compressed_size: u64) -> f64 {
        if original_size == 0 {
            return 0.0;
        }

        let savings = (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0;
        savings.max(0.0)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(80)
    }
}
