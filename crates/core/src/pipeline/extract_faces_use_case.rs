use std::path::PathBuf;
use std::sync::Arc;

use crate::detection::domain::detector_tuning::DetectorTuning;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_scorer::FaceScorer;
use crate::extraction::domain::extracted_face::OutputMode;
use crate::extraction::domain::face_extractor::FaceExtractor;
use crate::extraction::domain::face_writer::FaceWriter;
use crate::pipeline::batch_executor::BatchExecutor;
use crate::pipeline::batch_result::BatchResult;
use crate::pipeline::source_processor::{DetectionSettings, SourceProcessor};
use crate::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MARGIN, DEFAULT_MIN_FACE_SIZE};
use crate::source::domain::image_loader::ImageLoader;

#[derive(Clone, Debug)]
pub struct ExtractFacesRequest {
    /// Source descriptors; a face's `source_index` is its position here.
    pub sources: Vec<String>,
    /// `None` returns crops inline as base64.
    pub output_dir: Option<PathBuf>,
    pub min_face_size: u32,
    pub confidence_threshold: f64,
}

impl ExtractFacesRequest {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            output_dir: None,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Batch extraction: every source is processed independently and the
/// accepted faces of all of them are aggregated into one [`BatchResult`].
pub struct ExtractFacesUseCase {
    loader: Arc<dyn ImageLoader>,
    detector: Arc<dyn FaceDetector>,
    writer: Arc<dyn FaceWriter>,
    executor: Box<dyn BatchExecutor>,
    tuning: DetectorTuning,
    margin: f64,
}

impl ExtractFacesUseCase {
    /// Uses the loose profile and the default margin unless overridden.
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        detector: Arc<dyn FaceDetector>,
        writer: Arc<dyn FaceWriter>,
        executor: Box<dyn BatchExecutor>,
    ) -> Self {
        Self {
            loader,
            detector,
            writer,
            executor,
            tuning: DetectorTuning::loose(),
            margin: DEFAULT_MARGIN,
        }
    }

    pub fn with_tuning(mut self, tuning: DetectorTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn execute(&self, request: &ExtractFacesRequest) -> BatchResult {
        let extractor = FaceExtractor::new(
            self.writer.clone(),
            self.margin,
            OutputMode::from_dir(request.output_dir.clone()),
        );
        let processor = SourceProcessor::new(
            self.loader.clone(),
            self.detector.clone(),
            DetectionSettings {
                min_face_size: request.min_face_size,
                tuning: self.tuning.clone(),
                scorer: FaceScorer::new(request.confidence_threshold),
            },
            Some(extractor),
        );

        log::info!("Extracting faces from {} source(s)", request.sources.len());
        let outcomes = self
            .executor
            .execute(&request.sources, &|index: usize, source: &str| {
                processor.process(index, source)
            });

        let result = BatchResult::new(outcomes, request.confidence_threshold);
        log::info!(
            "Batch finished: {} detected, {} accepted, {} source(s) failed",
            result.detected_count(),
            result.accepted_count(),
            result.failed_sources().count()
        );
        result
    }
}
