use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use facecrop_core::detection::domain::face_scorer::ScoredFace;
use facecrop_core::extraction::domain::extracted_face::{ExtractedFace, FaceOutput};
use facecrop_core::pipeline::batch_result::BatchResult;
use facecrop_core::pipeline::check_face_use_case::{CheckFaceReport, CheckFaceRequest};
use facecrop_core::pipeline::extract_faces_use_case::ExtractFacesRequest;
use facecrop_core::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MIN_FACE_SIZE};
use facecrop_core::shared::region::Region;

pub const MODEL_UNAVAILABLE: &str = "unable to load face detection model";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckJob {
    pub image_path: Option<String>,
    pub min_face_size: u32,
    pub confidence_threshold: f64,
}

impl Default for CheckJob {
    fn default() -> Self {
        Self {
            image_path: None,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl CheckJob {
    /// `Err` carries the response to print instead of running the job.
    pub fn into_request(self) -> Result<CheckFaceRequest, CheckResponse> {
        let source = self
            .image_path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| CheckResponse::failure(missing_parameter("image_path")))?;
        validate_threshold(self.confidence_threshold).map_err(CheckResponse::failure)?;
        Ok(CheckFaceRequest {
            source,
            min_face_size: self.min_face_size,
            confidence_threshold: self.confidence_threshold,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExtractJob {
    pub image_paths: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub min_face_size: u32,
    pub confidence_threshold: f64,
}

impl Default for ExtractJob {
    fn default() -> Self {
        Self {
            image_paths: None,
            output_dir: None,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl ExtractJob {
    pub fn into_request(self) -> Result<ExtractFacesRequest, ExtractResponse> {
        let sources = self
            .image_paths
            .filter(|paths| !paths.is_empty())
            .ok_or_else(|| ExtractResponse::failure(missing_parameter("image_paths")))?;
        validate_threshold(self.confidence_threshold).map_err(ExtractResponse::failure)?;
        Ok(ExtractFacesRequest {
            sources,
            output_dir: self.output_dir.filter(|d| !d.as_os_str().is_empty()),
            min_face_size: self.min_face_size,
            confidence_threshold: self.confidence_threshold,
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
}

impl From<&ScoredFace> for FaceBox {
    fn from(face: &ScoredFace) -> Self {
        Self {
            x: face.region.x,
            y: face.region.y,
            width: face.region.width,
            height: face.region.height,
            confidence: round3(face.confidence),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub success: bool,
    pub face_count: usize,
    pub confidence: f64,
    pub faces: Vec<FaceBox>,
    pub message: String,
}

impl CheckResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            face_count: 0,
            confidence: 0.0,
            faces: Vec::new(),
            message: message.into(),
        }
    }
}

impl From<CheckFaceReport> for CheckResponse {
    fn from(report: CheckFaceReport) -> Self {
        Self {
            success: report.success,
            face_count: report.face_count,
            confidence: round3(report.confidence),
            faces: report.faces.iter().map(FaceBox::from).collect(),
            message: report.message,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<Region> for BoundingBox {
    fn from(r: Region) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FaceArtifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// Detected face box, before the context margin.
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub source_image: String,
}

impl From<&ExtractedFace> for FaceArtifact {
    fn from(face: &ExtractedFace) -> Self {
        let (image_url, image_base64) = match &face.output {
            FaceOutput::Stored(path) => (Some(path.to_string_lossy().into_owned()), None),
            FaceOutput::Inline(payload) => (None, Some(payload.clone())),
        };
        Self {
            image_url,
            image_base64,
            bbox: face.face.region.into(),
            confidence: round3(face.face.confidence),
            source_image: face.source.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub faces: Vec<FaceArtifact>,
    pub message: String,
    pub face_count: usize,
    pub detected_count: usize,
    /// Highest accepted confidence across the batch, 0.0 when none.
    pub confidence: f64,
}

impl ExtractResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            faces: Vec::new(),
            message: message.into(),
            face_count: 0,
            detected_count: 0,
            confidence: 0.0,
        }
    }
}

impl From<&BatchResult> for ExtractResponse {
    fn from(result: &BatchResult) -> Self {
        let faces: Vec<FaceArtifact> = result.extracted_faces().map(FaceArtifact::from).collect();
        Self {
            success: result.success(),
            face_count: faces.len(),
            faces,
            message: result.message(),
            detected_count: result.detected_count(),
            confidence: round3(result.max_confidence()),
        }
    }
}

/// Printed when the job itself could not run (bad JSON, unreadable stdin).
#[derive(Debug, Serialize)]
pub struct JobFailure {
    pub success: bool,
    pub message: String,
}

impl JobFailure {
    pub fn new(error: &dyn std::error::Error) -> Self {
        Self {
            success: false,
            message: format!("job failed: {error}"),
        }
    }
}

fn missing_parameter(name: &str) -> String {
    format!("missing required parameter: {name}")
}

fn validate_threshold(threshold: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(format!(
            "confidence_threshold must be between 0.0 and 1.0, got {threshold}"
        ))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
