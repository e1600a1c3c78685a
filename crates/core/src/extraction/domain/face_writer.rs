use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to encode face crop: {0}")]
    Encode(String),
    #[error("failed to write face crop to {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists or serializes a cropped face image.
pub trait FaceWriter: Send + Sync {
    /// File extension (without dot) of the artifacts this writer produces.
    fn extension(&self) -> &'static str;

    /// Encodes the crop to in-memory bytes.
    fn encode(&self, crop: &image::RgbImage) -> Result<Vec<u8>, EncodeError>;

    /// Writes the crop to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, crop: &image::RgbImage) -> Result<(), EncodeError>;
}
