use std::sync::Arc;

use crate::detection::domain::detector_tuning::DetectorTuning;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_scorer::FaceScorer;
use crate::extraction::domain::face_extractor::FaceExtractor;
use crate::pipeline::batch_result::{ProcessError, ProcessedSource, SourceOutcome};
use crate::source::domain::image_loader::ImageLoader;
use crate::source::domain::image_source::ImageSource;

/// Detection parameters shared by every source of one request.
#[derive(Clone, Debug)]
pub struct DetectionSettings {
    pub min_face_size: u32,
    pub tuning: DetectorTuning,
    pub scorer: FaceScorer,
}

/// Runs resolve → detect → score → (extract) for a single source.
///
/// Holds no per-source state, so one instance serves every worker.
pub struct SourceProcessor {
    loader: Arc<dyn ImageLoader>,
    detector: Arc<dyn FaceDetector>,
    settings: DetectionSettings,
    extractor: Option<FaceExtractor>,
}

impl SourceProcessor {
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        detector: Arc<dyn FaceDetector>,
        settings: DetectionSettings,
        extractor: Option<FaceExtractor>,
    ) -> Self {
        Self {
            loader,
            detector,
            settings,
            extractor,
        }
    }

    pub fn process(&self, index: usize, descriptor: &str) -> SourceOutcome {
        let result = self.run(index, descriptor);
        if let Err(e) = &result {
            log::warn!("Source {} ({}) skipped: {e}", index + 1, abbreviate(descriptor));
        }
        SourceOutcome {
            index,
            source: descriptor.to_string(),
            result,
        }
    }

    fn run(&self, index: usize, descriptor: &str) -> Result<ProcessedSource, ProcessError> {
        let source = ImageSource::parse(descriptor)?;
        let image = self.loader.load(&source)?;
        log::debug!(
            "Source {} decoded as {}x{} ({})",
            index + 1,
            image.width(),
            image.height(),
            source.kind()
        );

        let regions = self.detector.detect(
            &image,
            self.settings.min_face_size,
            &self.settings.tuning,
        )?;
        let scored = self.settings.scorer.score_all(&image, &regions);
        log::info!(
            "Source {}: {} detected, {} accepted",
            index + 1,
            scored.detected,
            scored.accepted.len()
        );

        let mut processed = ProcessedSource {
            scored,
            ..Default::default()
        };

        let Some(extractor) = &self.extractor else {
            return Ok(processed);
        };

        for face in &processed.scored.accepted {
            match extractor.extract(&image, face, index, descriptor) {
                Ok(extracted) => processed.extracted.push(extracted),
                Err(e) => {
                    log::warn!(
                        "Source {} face {} not encoded: {e}",
                        index + 1,
                        face.detection_index
                    );
                    processed.encode_failures += 1;
                }
            }
        }

        Ok(processed)
    }
}

/// Inline payloads can be megabytes long; keep log lines readable.
fn abbreviate(descriptor: &str) -> String {
    const MAX: usize = 80;
    match descriptor.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &descriptor[..cut]),
        None => descriptor.to_string(),
    }
}
