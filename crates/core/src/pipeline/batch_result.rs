use thiserror::Error;

use crate::detection::domain::face_detector::DetectError;
use crate::detection::domain::face_scorer::{FaceVerdict, ScoredDetections, ScoredFace};
use crate::extraction::domain::extracted_face::ExtractedFace;
use crate::source::domain::image_source::SourceError;

/// Why one source produced no detections.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Detection(#[from] DetectError),
    #[error("processing panicked: {0}")]
    Panicked(String),
}

/// Detections and artifacts for a source that was read successfully.
#[derive(Debug, Default)]
pub struct ProcessedSource {
    pub scored: ScoredDetections,
    /// One entry per accepted face that encoded cleanly, in face order.
    pub extracted: Vec<ExtractedFace>,
    pub encode_failures: usize,
}

/// Per-source result. Failures stay attached to their source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub index: usize,
    pub source: String,
    pub result: Result<ProcessedSource, ProcessError>,
}

impl SourceOutcome {
    pub fn failed(index: usize, source: impl Into<String>, error: ProcessError) -> Self {
        Self {
            index,
            source: source.into(),
            result: Err(error),
        }
    }

    pub fn processed(&self) -> Option<&ProcessedSource> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ProcessError> {
        self.result.as_ref().err()
    }
}

/// Aggregate over every source of a batch, in input order.
#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<SourceOutcome>,
    pub confidence_threshold: f64,
}

impl BatchResult {
    pub fn new(mut outcomes: Vec<SourceOutcome>, confidence_threshold: f64) -> Self {
        outcomes.sort_by_key(|o| o.index);
        Self {
            outcomes,
            confidence_threshold,
        }
    }

    /// Raw detections across all readable sources.
    pub fn detected_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(SourceOutcome::processed)
            .map(|p| p.scored.detected)
            .sum()
    }

    /// Faces at or above the threshold across all readable sources.
    pub fn accepted_count(&self) -> usize {
        self.accepted_faces().count()
    }

    pub fn accepted_faces(&self) -> impl Iterator<Item = &ScoredFace> {
        self.outcomes
            .iter()
            .filter_map(SourceOutcome::processed)
            .flat_map(|p| p.scored.accepted.iter())
    }

    pub fn extracted_faces(&self) -> impl Iterator<Item = &ExtractedFace> {
        self.outcomes
            .iter()
            .filter_map(SourceOutcome::processed)
            .flat_map(|p| p.extracted.iter())
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = (&SourceOutcome, &ProcessError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error().map(|e| (o, e)))
    }

    pub fn encode_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(SourceOutcome::processed)
            .map(|p| p.encode_failures)
            .sum()
    }

    pub fn max_confidence(&self) -> f64 {
        self.accepted_faces()
            .map(|f| f.confidence)
            .fold(0.0, f64::max)
    }

    pub fn verdict(&self) -> FaceVerdict {
        FaceVerdict::from_counts(self.detected_count(), self.accepted_count())
    }

    /// True when at least one face was accepted anywhere in the batch.
    pub fn success(&self) -> bool {
        self.verdict().is_success()
    }

    /// Human-readable summary of an extraction batch.
    pub fn message(&self) -> String {
        let mut message = match self.verdict().failure_message(self.confidence_threshold) {
            None => format!("extracted {} face(s)", self.extracted_faces().count()),
            Some(reason) => reason,
        };

        let failed = self.failed_sources().count();
        if failed > 0 {
            message.push_str(&format!("; {failed} of {} source(s) could not be processed", self.outcomes.len()));
        }
        let encode_failures = self.encode_failures();
        if encode_failures > 0 {
            message.push_str(&format!("; {encode_failures} face(s) could not be encoded"));
        }
        message
    }
}
