// blazing-webp/src/core/processor.rs
use super::{ConvertError, EngineConfig, Image, Outcome, Parameters, Result};
use crate::processors::{Compressor, Loader, MetadataProcessor, Resizer, WEBP_MAX_DIMENSION};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Converts one source image into a WebP file.
///
/// Holds no mutable state, so a single codec is shared by every worker.
pub struct ImageCodec {
    loader: Loader,
    resizer: Resizer,
    metadata_processor: MetadataProcessor,
    auto_orient: bool,
}

impl ImageCodec {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            loader: Loader::new().with_max_file_size(config.max_file_size),
            resizer: Resizer::new(config.algorithm),
            metadata_processor: MetadataProcessor::new(),
            auto_orient: config.auto_orient,
        }
    }

    /// Convert `image` with `parameters`.
    ///
    /// Every failure, including a panic inside a decoder, is folded into the
    /// returned `Outcome::Error`.
    pub fn convert(&self, image: &Image, parameters: &Parameters) -> Outcome {
        let start = Instant::now();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.try_convert(image, parameters)
        }))
        .unwrap_or_else(|_| {
            Err(ConvertError::CodecFailure(
                "Image can't be converted: decoder panicked".to_string(),
            ))
        });

        match result {
            Ok(size) => Outcome::success(&image.full_path, size, start.elapsed()),
            Err(e) => {
                log::warn!("Failed to convert {}: {}", image.full_path.display(), e);
                Outcome::error(&image.full_path, e, start.elapsed())
            }
        }
    }

    fn try_convert(&self, image: &Image, parameters: &Parameters) -> Result<u64> {
        let output_path = parameters.output_path(image);
        if same_file(&image.full_path, &output_path) {
            return Err(ConvertError::CodecFailure(format!(
                "Output would overwrite the source: {}",
                output_path.display()
            )));
        }

        let mut decoded = self.loader.load(&image.full_path)?;

        if self.auto_orient {
            decoded = self.metadata_processor.auto_orient(decoded, &image.full_path);
        }

        // Check the WebP limit before allocating the resized buffer
        let (width, height) = Resizer::target_dimensions(
            decoded.width(),
            decoded.height(),
            parameters.resize,
            parameters.resize_to,
            parameters.is_enlarging_allowed,
        )
        .unwrap_or((decoded.width(), decoded.height()));
        if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(ConvertError::CodecFailure(format!(
                "Output {}x{} exceeds the WebP limit of {} pixels per side",
                width, height, WEBP_MAX_DIMENSION
            )));
        }

        let decoded = self.resizer.fit(
            decoded,
            parameters.resize,
            parameters.resize_to,
            parameters.is_enlarging_allowed,
        );

        self.ensure_output_dir(&output_path)?;
        let compressor = Compressor::new(parameters.quality).with_lossless(parameters.is_lossless);
        compressor.save(&decoded, &output_path)
    }

    fn ensure_output_dir(&self, output_path: &Path) -> Result<()> {
        let Some(parent) = output_path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(parent).map_err(|e| {
            ConvertError::CodecFailure(format!(
                "Save folder can't be created {}: {}",
                parent.display(),
                e
            ))
        })
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    let canonical = |p: &Path| -> PathBuf { p.canonicalize().unwrap_or_else(|_| p.to_path_buf()) };
    canonical(a) == canonical(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResizeMode, Status};
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use image::GenericImageView;

    #[test]
    fn converts_png_into_save_folder() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.child("photo.png");
        image::RgbImage::new(20, 10).save(input.path()).unwrap();
        let out_dir = temp_dir.child("out");

        let image = Image::from_path(input.path()).unwrap();
        let params = Parameters {
            save_folder: Some(out_dir.path().to_path_buf()),
            ..Default::default()
        };

        match ImageCodec::default().convert(&image, &params) {
            Outcome::Success(success) => {
                assert_eq!(success.full_path, image.full_path);
                assert!(success.size > 0);
            }
            Outcome::Error(e) => panic!("conversion failed: {}", e.error),
        }
        assert!(out_dir.path().join("photo.webp").exists());
    }

    #[test]
    fn resize_is_applied_before_encoding() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.child("big.png");
        image::RgbImage::new(200, 100).save(input.path()).unwrap();

        let image = Image::from_path(input.path()).unwrap();
        let params = Parameters {
            resize: ResizeMode::LongerSide,
            resize_to: 50,
            ..Default::default()
        };

        assert!(ImageCodec::default().convert(&image, &params).is_success());
        let written = image::open(temp_dir.child("big.webp").path()).unwrap();
        assert_eq!(written.dimensions(), (50, 25));
    }

    #[test]
    fn corrupt_source_becomes_process_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.child("broken.jpg");
        input.write_binary(&[0xFF, 0xD8, 0x00, 0x01, 0x02]).unwrap();

        let image = Image::from_path(input.path()).unwrap();
        let outcome = ImageCodec::default().convert(&image, &Parameters::default());

        match outcome {
            Outcome::Error(e) => {
                assert_eq!(e.full_path, image.full_path);
                assert!(!e.error.is_empty());
            }
            Outcome::Success(_) => panic!("corrupt input converted"),
        }
        assert!(!temp_dir.path().join("broken.webp").exists());
        assert_eq!(image.status, Status::Todo);
    }

    #[test]
    fn refuses_to_overwrite_webp_source() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.child("already.webp");
        let bytes = Compressor::default()
            .compress_to_bytes(&image::DynamicImage::new_rgb8(8, 8))
            .unwrap();
        input.write_binary(&bytes).unwrap();

        let image = Image::from_path(input.path()).unwrap();
        let outcome = ImageCodec::default().convert(&image, &Parameters::default());
        assert!(!outcome.is_success());
        assert_eq!(std::fs::read(input.path()).unwrap(), bytes);
    }

    #[test]
    fn oversized_resize_target_fails_before_resizing() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.child("strip.png");
        image::RgbImage::new(100, 1).save(input.path()).unwrap();

        let image = Image::from_path(input.path()).unwrap();
        let params = Parameters {
            resize: ResizeMode::ShorterSide,
            resize_to: 16_000,
            is_enlarging_allowed: true,
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        match ImageCodec::default().convert(&image, &params) {
            Outcome::Error(e) => assert!(e.error.contains("WebP limit")),
            Outcome::Success(_) => panic!("1600000x16000 output was accepted"),
        }
        assert!(!temp_dir.path().join("strip.webp").exists());
    }

    #[test]
    fn unwritable_save_folder_becomes_process_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.child("photo.png");
        image::RgbImage::new(8, 8).save(input.path()).unwrap();
        let blocker = temp_dir.child("out");
        blocker.write_str("not a directory").unwrap();

        let image = Image::from_path(input.path()).unwrap();
        let params = Parameters {
            save_folder: Some(blocker.path().to_path_buf()),
            ..Default::default()
        };

        let outcome = ImageCodec::default().convert(&image, &params);
        assert!(matches!(outcome, Outcome::Error(_)));
        assert!(!temp_dir.path().join("photo.webp").exists());
        assert!(!blocker.path().join("photo.webp").exists());
        assert_eq!(std::fs::read_to_string(blocker.path()).unwrap(), "not a directory");
    }
}
