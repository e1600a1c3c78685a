use std::sync::Arc;

use crate::detection::domain::detector_tuning::DetectorTuning;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_scorer::{FaceScorer, FaceVerdict, ScoredFace};
use crate::pipeline::batch_executor::process_isolated;
use crate::pipeline::batch_result::ProcessError;
use crate::pipeline::source_processor::{DetectionSettings, SourceProcessor};
use crate::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MIN_FACE_SIZE};
use crate::source::domain::image_loader::ImageLoader;

#[derive(Clone, Debug)]
pub struct CheckFaceRequest {
    pub source: String,
    pub min_face_size: u32,
    pub confidence_threshold: f64,
}

impl CheckFaceRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Whether one image contains at least one clear face.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckFaceReport {
    pub success: bool,
    /// Accepted count when any face was accepted, otherwise the raw count.
    pub face_count: usize,
    pub detected_count: usize,
    /// Highest accepted confidence, 0.0 when none.
    pub confidence: f64,
    pub faces: Vec<ScoredFace>,
    pub message: String,
}

impl CheckFaceReport {
    fn failed(error: &ProcessError) -> Self {
        let message = match error {
            ProcessError::Source(e) => format!("failed to read image: {e}"),
            other => format!("face detection failed: {other}"),
        };
        Self {
            success: false,
            face_count: 0,
            detected_count: 0,
            confidence: 0.0,
            faces: Vec::new(),
            message,
        }
    }
}

/// Single-image presence check: resolve → detect → score → verdict.
pub struct CheckFaceUseCase {
    loader: Arc<dyn ImageLoader>,
    detector: Arc<dyn FaceDetector>,
    tuning: DetectorTuning,
}

impl CheckFaceUseCase {
    /// Uses the strict profile unless overridden with [`Self::with_tuning`].
    pub fn new(loader: Arc<dyn ImageLoader>, detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            loader,
            detector,
            tuning: DetectorTuning::strict(),
        }
    }

    pub fn with_tuning(mut self, tuning: DetectorTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn execute(&self, request: &CheckFaceRequest) -> CheckFaceReport {
        let scorer = FaceScorer::new(request.confidence_threshold);
        let processor = SourceProcessor::new(
            self.loader.clone(),
            self.detector.clone(),
            DetectionSettings {
                min_face_size: request.min_face_size,
                tuning: self.tuning.clone(),
                scorer,
            },
            None,
        );

        let outcome = process_isolated(
            &|index: usize, source: &str| processor.process(index, source),
            0,
            &request.source,
        );
        let scored = match outcome.result {
            Ok(processed) => processed.scored,
            Err(e) => return CheckFaceReport::failed(&e),
        };

        let verdict = scored.verdict();
        let message = match verdict.failure_message(scorer.threshold()) {
            Some(reason) => reason,
            None => format!("detected {} clear face(s)", scored.accepted.len()),
        };
        let face_count = match verdict {
            FaceVerdict::Accepted { accepted } => accepted,
            FaceVerdict::BelowConfidenceThreshold { detected } => detected,
            FaceVerdict::NoFaceDetected => 0,
        };

        CheckFaceReport {
            success: verdict.is_success(),
            face_count,
            detected_count: scored.detected,
            confidence: scored.max_confidence(),
            faces: scored.accepted,
            message,
        }
    }
}
