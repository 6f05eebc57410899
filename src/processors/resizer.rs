// blazing-webp/src/processors/resizer.rs
use crate::core::{ResizeAlgorithm, ResizeMode};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

pub struct Resizer {
    algorithm: ResizeAlgorithm,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Scale `image` so the side selected by `mode` becomes `resize_to`.
    ///
    /// Returns the image untouched when no resize is needed, or when the
    /// resize would enlarge it and `allow_enlarging` is false.
    pub fn fit(
        &self,
        image: DynamicImage,
        mode: ResizeMode,
        resize_to: u32,
        allow_enlarging: bool,
    ) -> DynamicImage {
        let (orig_width, orig_height) = image.dimensions();
        let Some((width, height)) =
            Self::target_dimensions(orig_width, orig_height, mode, resize_to, allow_enlarging)
        else {
            return image;
        };

        if width == orig_width && height == orig_height {
            log::debug!("Image dimensions unchanged, skipping resize");
            return image;
        }

        log::debug!(
            "Resizing image from {}x{} to {}x{}",
            orig_width,
            orig_height,
            width,
            height
        );

        image.resize_exact(width, height, self.get_filter_type())
    }

    /// Output dimensions for a source of `width`x`height`, or `None` to keep it as is.
    pub fn target_dimensions(
        width: u32,
        height: u32,
        mode: ResizeMode,
        resize_to: u32,
        allow_enlarging: bool,
    ) -> Option<(u32, u32)> {
        if resize_to == 0 || width == 0 || height == 0 {
            return None;
        }

        let reference = match mode {
            ResizeMode::NoResizing => return None,
            ResizeMode::LongerSide => width.max(height),
            ResizeMode::ShorterSide => width.min(height),
        };

        if resize_to > reference && !allow_enlarging {
            log::debug!(
                "Target {} exceeds source side {} and enlarging is disabled",
                resize_to,
                reference
            );
            return None;
        }

        let scale = |side: u32| -> u32 {
            let scaled = (side as u64 * resize_to as u64 + reference as u64 / 2) / reference as u64;
            scaled.clamp(1, u32::MAX as u64) as u32
        };

        Some((scale(width), scale(height)))
    }

    fn get_filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(ResizeAlgorithm::default())
    }
}
