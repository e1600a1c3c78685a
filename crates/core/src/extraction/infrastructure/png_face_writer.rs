use std::io::Cursor;
use std::path::Path;

use crate::extraction::domain::face_writer::{EncodeError, FaceWriter};

/// Encodes face crops as lossless PNG using the `image` crate.
pub struct PngFaceWriter;

impl PngFaceWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngFaceWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceWriter for PngFaceWriter {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn encode(&self, crop: &image::RgbImage) -> Result<Vec<u8>, EncodeError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(EncodeError::Encode("crop has no pixels".to_string()));
        }
        let mut buf = Cursor::new(Vec::new());
        crop.write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }

    fn write(&self, path: &Path, crop: &image::RgbImage) -> Result<(), EncodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EncodeError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let bytes = self.encode(crop)?;
        std::fs::write(path, bytes).map_err(|e| EncodeError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
