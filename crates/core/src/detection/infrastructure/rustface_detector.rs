//! Frontal face detector backed by the `rustface` crate (SeetaFace cascade).
use std::fs;
use std::io::Cursor;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::detection::domain::detector_tuning::DetectorTuning;
use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::shared::constants::MIN_SUPPORTED_FACE_SIZE;
use crate::shared::decoded_image::DecodedImage;
use crate::shared::region::Region;

/// A loaded SeetaFace model. Immutable once loaded; cheap to share via `Arc`.
#[derive(Clone)]
pub struct DetectionModel {
    model: Arc<rustface::Model>,
    origin: PathBuf,
}

impl DetectionModel {
    /// Loads a model file. Missing, empty and unparsable files are errors.
    pub fn load(path: &Path) -> Result<Self, String> {
        let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        if bytes.is_empty() {
            return Err(format!("{}: model file is empty", path.display()));
        }

        // Truncated or foreign files can trip assertions inside the parser.
        let parsed = panic::catch_unwind(|| rustface::read_model(Cursor::new(&bytes[..])))
            .map_err(|_| format!("{}: model parser panicked", path.display()))?;
        let model = parsed.map_err(|e| format!("{}: {e}", path.display()))?;

        Ok(Self {
            model: Arc::new(model),
            origin: path.to_path_buf(),
        })
    }

    /// Where this model was loaded from.
    pub fn origin(&self) -> &Path {
        &self.origin
    }
}

impl std::fmt::Debug for DetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionModel")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Runs the cascade on the grayscale projection.
///
/// The cascade object itself is stateful, so each call builds a fresh one
/// from the shared model; the model is never mutated.
pub struct RustfaceDetector {
    model: DetectionModel,
}

impl RustfaceDetector {
    pub fn new(model: DetectionModel) -> Self {
        Self { model }
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(
        &self,
        image: &DecodedImage,
        min_face_size: u32,
        tuning: &DetectorTuning,
    ) -> Result<Vec<Region>, DetectError> {
        tuning.validate()?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyImage);
        }

        let min_face_size = min_face_size.max(MIN_SUPPORTED_FACE_SIZE);
        if width < min_face_size || height < min_face_size {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model((*self.model.model).clone());
        // Some rustface releases ignore this; `to_regions` enforces it either way.
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(tuning.score_thresh);
        detector.set_pyramid_scale_factor(tuning.pyramid_scale_factor);
        detector.set_slide_window_step(tuning.slide_window_step, tuning.slide_window_step);

        let faces = detector.detect(&rustface::ImageData::new(image.gray(), width, height));
        let boxes = faces.iter().map(|face| {
            let bbox = face.bbox();
            (
                bbox.x() as i64,
                bbox.y() as i64,
                bbox.width() as i64,
                bbox.height() as i64,
            )
        });

        Ok(to_regions(boxes, min_face_size, width, height))
    }
}

/// Clips raw `(x, y, width, height)` boxes to the image and drops those
/// left smaller than `min_face_size` on either side. Order is preserved.
fn to_regions(
    boxes: impl IntoIterator<Item = (i64, i64, i64, i64)>,
    min_face_size: u32,
    width: u32,
    height: u32,
) -> Vec<Region> {
    boxes
        .into_iter()
        .filter_map(|(x, y, w, h)| Region::clipped(x, y, w, h, width, height))
        .filter(|region| region.width >= min_face_size && region.height >= min_face_size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_scorer::FaceScorer;
    use crate::detection::infrastructure::model_resolver::{self, ModelLocations};

    /// The SeetaFace model is not shipped with the sources. Tests that need it
    /// read `FACECROP_TEST_MODEL` or fall back to the normal search, and return
    /// early when neither finds a model.
    fn try_detector() -> Option<RustfaceDetector> {
        let locations = ModelLocations {
            explicit: std::env::var_os("FACECROP_TEST_MODEL").map(PathBuf::from),
            download_url: None,
        };
        model_resolver::resolve(&locations).ok().map(RustfaceDetector::new)
    }

    /// `FACECROP_TEST_IMAGE` if set (ideally a photo with faces), otherwise a
    /// synthetic 320x240 image with some structure for the cascade to scan.
    fn sample_image() -> DecodedImage {
        if let Some(path) = std::env::var_os("FACECROP_TEST_IMAGE") {
            let img = image::open(PathBuf::from(path)).unwrap();
            return DecodedImage::from_rgb(img.to_rgb8());
        }
        DecodedImage::from_rgb(image::RgbImage::from_fn(320, 240, |x, y| {
            let dx = x as i64 - 160;
            let dy = y as i64 - 120;
            let v = if dx * dx / 4 + dy * dy / 9 < 1600 {
                (200 - (dx.abs() + dy.abs()) / 2) as u8
            } else {
                ((x * 7 + y * 3) % 64) as u8
            };
            image::Rgb([v, v, v])
        }))
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = DetectionModel::load(Path::new("/nonexistent/seeta.bin")).unwrap_err();
        assert!(err.contains("/nonexistent/seeta.bin"));
    }

    #[test]
    fn test_load_empty_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeta.bin");
        fs::write(&path, b"").unwrap();
        let err = DetectionModel::load(&path).unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_loaded_model_remembers_origin() {
        let Some(path) = std::env::var_os("FACECROP_TEST_MODEL").map(PathBuf::from) else {
            return;
        };
        let model = DetectionModel::load(&path).unwrap();
        assert_eq!(model.origin(), path.as_path());
        assert!(format!("{model:?}").contains(&*path.to_string_lossy()));
    }

    #[test]
    fn test_boxes_below_min_face_size_are_dropped() {
        let boxes = vec![
            (10, 10, 100, 100),
            (200, 10, 60, 60),
            (10, 150, 120, 70),
            (50, 50, 80, 80),
        ];
        let regions = to_regions(boxes, 80, 400, 300);
        assert_eq!(
            regions,
            vec![Region::new(10, 10, 100, 100), Region::new(50, 50, 80, 80)]
        );
    }

    #[test]
    fn test_size_is_checked_after_clipping() {
        // 100 px wide on paper, 40 px inside the image.
        let boxes = vec![(-60, 10, 100, 100), (300, 200, 100, 100), (500, 500, 90, 90)];
        let regions = to_regions(boxes, 80, 400, 300);
        assert_eq!(regions, vec![Region::new(300, 200, 100, 100)]);
    }

    #[test]
    fn test_detections_respect_min_face_size() {
        let Some(detector) = try_detector() else {
            return;
        };
        let image = sample_image();
        for min_face_size in [20, 80, 120] {
            let regions = detector
                .detect(&image, min_face_size, &DetectorTuning::loose())
                .unwrap();
            for region in &regions {
                assert!(region.width >= min_face_size && region.height >= min_face_size);
                assert!(region.right() <= image.width() && region.bottom() <= image.height());
            }
        }
    }

    #[test]
    fn test_detection_is_deterministic() {
        let Some(detector) = try_detector() else {
            return;
        };
        let image = sample_image();
        let tuning = DetectorTuning::loose();
        let first = detector.detect(&image, 40, &tuning).unwrap();
        let second = detector.detect(&image, 40, &tuning).unwrap();
        assert_eq!(first, second);

        let scorer = FaceScorer::new(0.0);
        let confidences = |regions: &[Region]| -> Vec<f64> {
            scorer
                .score_all(&image, regions)
                .accepted
                .iter()
                .map(|face| face.confidence)
                .collect()
        };
        assert_eq!(confidences(&first), confidences(&second));
    }

    #[test]
    fn test_strict_finds_no_more_than_loose() {
        let Some(detector) = try_detector() else {
            return;
        };
        let image = sample_image();
        let strict = detector.detect(&image, 40, &DetectorTuning::strict()).unwrap();
        let loose = detector.detect(&image, 40, &DetectorTuning::loose()).unwrap();
        assert!(strict.len() <= loose.len());
    }

    #[test]
    fn test_image_smaller_than_min_face_size_has_no_faces() {
        let Some(detector) = try_detector() else {
            return;
        };
        let tiny = DecodedImage::from_rgb(image::RgbImage::from_pixel(30, 30, image::Rgb([90, 90, 90])));
        let regions = detector.detect(&tiny, 40, &DetectorTuning::loose()).unwrap();
        assert!(regions.is_empty());
    }
}
