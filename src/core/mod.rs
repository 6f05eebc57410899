// blazing-webp/src/core/mod.rs
mod record;
pub mod processor;

pub use self::record::{Image, Outcome, ProcessError, Status, Success};

use crate::processors::WEBP_MAX_DIMENSION;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest accepted width or height of a decoded source.
pub const MAX_DIMENSION: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos3,
}

/// Which side of the source `resize_to` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeMode {
    #[default]
    NoResizing,
    LongerSide,
    ShorterSide,
}

/// Conversion settings shared by every image of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub is_lossless: bool,
    /// Ignored when `is_lossless` is set.
    pub quality: u8,
    #[serde(default)]
    pub resize: ResizeMode,
    #[serde(default)]
    pub resize_to: u32,
    #[serde(default)]
    pub is_enlarging_allowed: bool,
    /// `None` writes the output next to its source.
    #[serde(default, deserialize_with = "empty_path_as_none")]
    pub save_folder: Option<PathBuf>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            is_lossless: false,
            quality: 80,
            resize: ResizeMode::NoResizing,
            resize_to: 0,
            is_enlarging_allowed: false,
            save_folder: None,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConvertError::InvalidParameter(
                "Quality must be between 0 and 100".to_string(),
            ));
        }

        if self.resize != ResizeMode::NoResizing {
            if self.resize_to == 0 {
                return Err(ConvertError::InvalidParameter(
                    "A resize target is required when resizing".to_string(),
                ));
            }
            if self.resize_to > WEBP_MAX_DIMENSION {
                return Err(ConvertError::InvalidParameter(format!(
                    "Resize target too large (max {} pixels)",
                    WEBP_MAX_DIMENSION
                )));
            }
        }

        if let Some(folder) = &self.save_folder {
            if folder.exists() && !folder.is_dir() {
                return Err(ConvertError::InvalidParameter(format!(
                    "Save folder exists but is not a directory: {}",
                    folder.display()
                )));
            }
        }

        Ok(())
    }

    /// Directory the WebP for `image` is written to.
    pub fn output_dir<'a>(&'a self, image: &'a Image) -> &'a Path {
        self.save_folder.as_deref().unwrap_or(image.path.as_path())
    }

    /// Source file stem with a `.webp` extension, in `output_dir`.
    pub fn output_path(&self, image: &Image) -> PathBuf {
        let stem = image
            .full_path
            .file_stem()
            .unwrap_or_else(|| OsStr::new(&image.filename));
        let mut name = stem.to_os_string();
        name.push(".webp");
        self.output_dir(image).join(name)
    }
}

fn empty_path_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
}

/// Engine-wide settings, fixed for the lifetime of a `BatchProcessor`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of workers; 0 uses one per available CPU.
    pub concurrency: usize,
    pub algorithm: ResizeAlgorithm,
    pub max_file_size: Option<u64>,
    /// Rotate sources according to their EXIF orientation before encoding.
    pub auto_orient: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            algorithm: ResizeAlgorithm::Lanczos3,
            max_file_size: None,
            auto_orient: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency > 1024 {
            return Err(ConvertError::InvalidParameter(
                "Concurrency too large (max 1024 workers)".to_string(),
            ));
        }

        if self.max_file_size == Some(0) {
            return Err(ConvertError::InvalidParameter(
                "Maximum file size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    WrongFormat,
    AlreadyExists,
    Unreadable,
    CodecFailure,
    InvalidParameter,
    InvalidState,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Unsupported format: {}", .0.display())]
    WrongFormat(PathBuf),

    #[error("Image already added: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{} would overwrite {}, already claimed by another image", .path.display(), .output.display())]
    OutputTaken { path: PathBuf, output: PathBuf },

    #[error("Cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion failed: {0}")]
    CodecFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WrongFormat(_) => ErrorKind::WrongFormat,
            Self::AlreadyExists(_) | Self::OutputTaken { .. } => ErrorKind::AlreadyExists,
            Self::Unreadable { .. } => ErrorKind::Unreadable,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::CodecFailure(_)
            | Self::Io(_)
            | Self::Image(_)
            | Self::MemoryLimitExceeded(_) => ErrorKind::CodecFailure,
        }
    }

    /// The file a submission error refers to.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::WrongFormat(path) | Self::AlreadyExists(path) => Some(path.as_path()),
            Self::Unreadable { path, .. } | Self::OutputTaken { path, .. } => {
                Some(path.as_path())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_reject_out_of_range_quality() {
        let params = Parameters {
            quality: 101,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn parameters_require_target_when_resizing() {
        let params = Parameters {
            resize: ResizeMode::LongerSide,
            resize_to: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = Parameters {
            resize: ResizeMode::LongerSide,
            resize_to: 800,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn parameters_deserialize_from_front_end_shape() {
        let json = r#"{
            "isLossless": false,
            "quality": 75,
            "resize": "ShorterSide",
            "resizeTo": 512,
            "isEnlargingAllowed": true,
            "saveFolder": ""
        }"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.quality, 75);
        assert_eq!(params.resize, ResizeMode::ShorterSide);
        assert_eq!(params.resize_to, 512);
        assert!(params.is_enlarging_allowed);
        assert_eq!(params.save_folder, None);
    }

    #[test]
    fn output_path_falls_back_to_source_folder() {
        let image = Image {
            full_path: PathBuf::from("/photos/cat.png"),
            filename: "cat.png".to_string(),
            extension: "png".to_string(),
            path: PathBuf::from("/photos"),
            original_size: 10,
            webp_size: 0,
            status: Status::Todo,
            error_message: String::new(),
            in_progress: false,
        };

        let params = Parameters::default();
        assert_eq!(params.output_path(&image), PathBuf::from("/photos/cat.webp"));

        let params = Parameters {
            save_folder: Some(PathBuf::from("/out")),
            ..Default::default()
        };
        assert_eq!(params.output_path(&image), PathBuf::from("/out/cat.webp"));
    }

    #[test]
    fn resize_target_is_capped_at_webp_limit() {
        let params = Parameters {
            resize: ResizeMode::LongerSide,
            resize_to: WEBP_MAX_DIMENSION,
            is_enlarging_allowed: true,
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        let params = Parameters {
            resize_to: WEBP_MAX_DIMENSION + 1,
            ..params
        };
        assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::InvalidParameter);
    }

    #[cfg(unix)]
    #[test]
    fn output_path_keeps_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let source = Path::new("/photos").join(OsStr::from_bytes(b"caf\xe9.png"));
        let image = Image::new(&source, 10);

        assert_eq!(
            Parameters::default().output_path(&image),
            Path::new("/photos").join(OsStr::from_bytes(b"caf\xe9.webp"))
        );
    }

    #[test]
    fn io_failures_are_codec_failures() {
        let err = ConvertError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.kind(), ErrorKind::CodecFailure);
    }
}
