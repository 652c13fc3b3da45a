//! Error types shared by the scanning and configuration code.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read the basic facts of a single image file.
///
/// Optional metadata (EXIF, ICC, format extras) never produces one of these,
/// a missing field is simply left out of the report.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Failure decoding {1}: {0}")]
    Decode(#[source] image::ImageError, PathBuf),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Could not determine pixel size of {0}")]
    MissingDimensions(PathBuf),
}

impl InspectError {
    pub fn path(&self) -> &PathBuf {
        match self {
            InspectError::Io(_, path)
            | InspectError::Decode(_, path)
            | InspectError::UnsupportedFormat(path)
            | InspectError::MissingDimensions(path) => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("I/O error for config {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Failure parsing config json: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Failure decoding {1}: {0}")]
    Decode(#[source] image::ImageError, PathBuf),

    #[error("No decoder for {0}")]
    Unsupported(PathBuf),

    #[error("Failure resizing thumbnail: {0}")]
    Resize(String),
}
