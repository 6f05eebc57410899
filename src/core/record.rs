// blazing-webp/src/core/record.rs
use super::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Conversion state of a submitted image.
///
/// Serialized with the wire values the front-end understands; the older
/// spellings are still accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "TO DO", alias = "TODO")]
    Todo,
    #[serde(rename = "DONE", alias = "SUCCESS")]
    Success,
    #[serde(rename = "ERROR")]
    Error,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Todo)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Todo => "TO DO",
            Status::Success => "DONE",
            Status::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub full_path: PathBuf,
    pub filename: String,
    pub extension: String,
    pub path: PathBuf,
    pub original_size: u64,
    #[serde(default)]
    pub webp_size: u64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub in_progress: bool,
}

impl Image {
    /// Build a fresh TODO record for the file at `full_path`.
    ///
    /// Reads the file metadata to get the original size, so the file must exist.
    pub fn from_path<P: AsRef<Path>>(full_path: P) -> Result<Self> {
        let full_path = full_path.as_ref();

        let metadata = std::fs::metadata(full_path).map_err(|source| ConvertError::Unreadable {
            path: full_path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ConvertError::Unreadable {
                path: full_path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            });
        }

        Ok(Self::new(full_path, metadata.len()))
    }

    pub fn new<P: AsRef<Path>>(full_path: P, original_size: u64) -> Self {
        let full_path = full_path.as_ref();
        let filename = full_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = full_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            full_path: full_path.to_path_buf(),
            filename,
            extension,
            path,
            original_size,
            webp_size: 0,
            status: Status::Todo,
            error_message: String::new(),
            in_progress: false,
        }
    }

    /// Bytes saved by the conversion; negative when the WebP came out larger.
    pub fn savings(&self) -> Option<i64> {
        (self.status == Status::Success).then(|| self.original_size as i64 - self.webp_size as i64)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Success {
    pub full_path: PathBuf,
    pub size: u64,
    #[serde(default)]
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessError {
    pub full_path: PathBuf,
    pub error: String,
    #[serde(default)]
    pub elapsed_ms: u64,
}

/// Terminal result of converting one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(Success),
    Error(ProcessError),
}

impl Outcome {
    pub fn success(full_path: &Path, size: u64, elapsed: Duration) -> Self {
        Outcome::Success(Success {
            full_path: full_path.to_path_buf(),
            size,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    pub fn error(full_path: &Path, error: impl fmt::Display, elapsed: Duration) -> Self {
        Outcome::Error(ProcessError {
            full_path: full_path.to_path_buf(),
            error: error.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    pub fn full_path(&self) -> &Path {
        match self {
            Outcome::Success(success) => &success.full_path,
            Outcome::Error(error) => &error.full_path,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Outcome::Success(success) => success.elapsed_ms,
            Outcome::Error(error) => error.elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}
