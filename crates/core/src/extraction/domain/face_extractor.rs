use std::sync::Arc;

use base64::Engine;

use crate::detection::domain::face_scorer::ScoredFace;
use crate::extraction::domain::extracted_face::{ExtractedFace, FaceOutput, OutputMode};
use crate::extraction::domain::face_writer::{EncodeError, FaceWriter};
use crate::shared::decoded_image::DecodedImage;

/// Crops accepted faces with a context margin and encodes them.
pub struct FaceExtractor {
    writer: Arc<dyn FaceWriter>,
    margin: f64,
    mode: OutputMode,
}

impl FaceExtractor {
    pub fn new(writer: Arc<dyn FaceWriter>, margin: f64, mode: OutputMode) -> Self {
        Self {
            writer,
            margin,
            mode,
        }
    }

    /// Artifact name, unique per (source, raw detection) pair within a batch.
    pub fn file_name(&self, source_index: usize, face_index: usize) -> String {
        format!(
            "face_{source_index}_{face_index}.{}",
            self.writer.extension()
        )
    }

    pub fn extract(
        &self,
        image: &DecodedImage,
        face: &ScoredFace,
        source_index: usize,
        source: &str,
    ) -> Result<ExtractedFace, EncodeError> {
        let crop_region = face
            .region
            .expand(self.margin, image.width(), image.height());
        let crop = image.crop(&crop_region);

        let output = match &self.mode {
            OutputMode::Directory(dir) => {
                let path = dir.join(self.file_name(source_index, face.detection_index));
                self.writer.write(&path, &crop)?;
                FaceOutput::Stored(path)
            }
            OutputMode::Inline => {
                let bytes = self.writer.encode(&crop)?;
                FaceOutput::Inline(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        };

        Ok(ExtractedFace {
            face: face.clone(),
            crop: crop_region,
            output,
            source_index,
            source: source.to_string(),
        })
    }
}
