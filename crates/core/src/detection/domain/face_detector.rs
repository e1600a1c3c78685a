use thiserror::Error;

use crate::detection::domain::detector_tuning::DetectorTuning;
use crate::shared::decoded_image::DecodedImage;
use crate::shared::region::Region;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("invalid detector tuning: {0}")]
    InvalidTuning(String),
    #[error("image has no pixels")]
    EmptyImage,
}

/// Domain interface for frontal face detection.
///
/// Detection reads only the grayscale projection of the image. Returned
/// regions lie inside the image and are at least `min_face_size` on each
/// side as far as the underlying detector guarantees it. Implementations
/// are shared read-only across batch workers, hence `&self` and `Sync`.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        image: &DecodedImage,
        min_face_size: u32,
        tuning: &DetectorTuning,
    ) -> Result<Vec<Region>, DetectError>;
}
