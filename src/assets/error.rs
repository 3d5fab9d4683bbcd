//! Asset error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading zone assets. None of these are fatal to a
/// zone: callers fall back to a gradient environment or no model.
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extension not handled by any decoder.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Bytes were read but could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// glTF parse or buffer resolution failed.
    #[error("glTF: {0}")]
    Gltf(#[from] gltf::Error),

    /// The loading thread went away before reporting a result.
    #[error("load cancelled")]
    Cancelled,
}

impl From<image::ImageError> for AssetError {
    fn from(e: image::ImageError) -> Self {
        AssetError::Decode(e.to_string())
    }
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
