// blazing-webp/src/processors/loader.rs
use crate::core::{ConvertError, Result, MAX_DIMENSION};
use crate::utils::image_format_to_string;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::path::Path;

#[derive(Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
    max_file_size: Option<u64>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((MAX_DIMENSION, MAX_DIMENSION)),
            max_file_size: None,
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: Option<u64>) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        log::debug!("Loading image from: {}", path.display());

        self.validate_path(path)?;

        // The extension may lie, so sniff the content first
        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| ConvertError::CodecFailure(format!("Failed to decode image: {}", e)))?;

        let (width, height) = image.dimensions();
        if let Some((max_w, max_h)) = self.max_dimensions {
            if width > max_w || height > max_h {
                return Err(ConvertError::MemoryLimitExceeded(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }

        log::debug!(
            "Loaded image: {}x{} pixels, color: {:?}",
            width,
            height,
            image.color()
        );

        Ok(image)
    }

    pub fn get_dimensions_and_format(&self, path: &Path) -> Result<(u32, u32, String)> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;

        let format = reader
            .format()
            .map(image_format_to_string)
            .unwrap_or_else(|| "Unknown".to_string());

        let (width, height) = reader.into_dimensions()?;

        Ok((width, height, format))
    }

    fn validate_path(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConvertError::CodecFailure(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let metadata = path.metadata()?;
        if metadata.len() == 0 {
            return Err(ConvertError::CodecFailure(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        if let Some(max_size) = self.max_file_size {
            if metadata.len() > max_size {
                return Err(ConvertError::MemoryLimitExceeded(format!(
                    "File size {} exceeds limit {}",
                    metadata.len(),
                    max_size
                )));
            }
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
