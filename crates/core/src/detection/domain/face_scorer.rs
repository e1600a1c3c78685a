use crate::detection::domain::sharpness::{confidence_from_sharpness, laplacian_variance};
use crate::shared::decoded_image::DecodedImage;
use crate::shared::region::Region;

/// A raw detection with its focus-quality score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredFace {
    /// Position of this box in the detector's raw output for its image.
    pub detection_index: usize,
    pub region: Region,
    /// Laplacian variance inside `region`, >= 0.
    pub sharpness: f64,
    /// `sharpness / 500` saturated to `[0, 1]`. A ranking heuristic, not a probability.
    pub confidence: f64,
}

impl ScoredFace {
    /// Scores `region` using only the pixels inside it.
    pub fn score(image: &DecodedImage, detection_index: usize, region: Region) -> Self {
        let sharpness = laplacian_variance(image.gray_region(&region));
        Self {
            detection_index,
            region,
            sharpness,
            confidence: confidence_from_sharpness(sharpness),
        }
    }
}

/// Outcome of scoring every raw detection of one image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoredDetections {
    /// Number of raw detections, accepted or not.
    pub detected: usize,
    /// Detections at or above the threshold, in detector order.
    pub accepted: Vec<ScoredFace>,
}

impl ScoredDetections {
    /// Highest accepted confidence; 0.0 when nothing was accepted.
    pub fn max_confidence(&self) -> f64 {
        self.accepted
            .iter()
            .map(|f| f.confidence)
            .fold(0.0, f64::max)
    }

    pub fn verdict(&self) -> FaceVerdict {
        FaceVerdict::from_counts(self.detected, self.accepted.len())
    }
}

/// Reported (not exceptional) result of a detection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceVerdict {
    Accepted { accepted: usize },
    BelowConfidenceThreshold { detected: usize },
    NoFaceDetected,
}

impl FaceVerdict {
    pub fn from_counts(detected: usize, accepted: usize) -> Self {
        if accepted > 0 {
            FaceVerdict::Accepted { accepted }
        } else if detected > 0 {
            FaceVerdict::BelowConfidenceThreshold { detected }
        } else {
            FaceVerdict::NoFaceDetected
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FaceVerdict::Accepted { .. })
    }

    /// User-facing guidance for the two failure verdicts.
    pub fn failure_message(&self, threshold: f64) -> Option<String> {
        match self {
            FaceVerdict::Accepted { .. } => None,
            FaceVerdict::BelowConfidenceThreshold { detected } => Some(format!(
                "detected {detected} face(s), but none is clear enough (confidence < {threshold})"
            )),
            FaceVerdict::NoFaceDetected => {
                Some("no face detected, please upload a clear frontal photo".to_string())
            }
        }
    }
}

/// Scores raw detections and keeps those meeting the confidence threshold.
#[derive(Clone, Copy, Debug)]
pub struct FaceScorer {
    threshold: f64,
}

impl FaceScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score_all(&self, image: &DecodedImage, regions: &[Region]) -> ScoredDetections {
        let accepted = regions
            .iter()
            .enumerate()
            .map(|(index, &region)| ScoredFace::score(image, index, region))
            .filter(|face| face.confidence >= self.threshold)
            .collect();
        ScoredDetections {
            detected: regions.len(),
            accepted,
        }
    }
}
