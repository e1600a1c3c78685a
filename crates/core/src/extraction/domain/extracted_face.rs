use std::path::{Path, PathBuf};

use crate::detection::domain::face_scorer::ScoredFace;
use crate::shared::region::Region;

/// Where extracted crops go. Exactly one form is produced per face.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Write each crop as a file in this directory.
    Directory(PathBuf),
    /// Return each crop as a base64 payload.
    Inline,
}

impl OutputMode {
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => OutputMode::Directory(dir),
            None => OutputMode::Inline,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaceOutput {
    Stored(PathBuf),
    Inline(String),
}

/// An accepted face cropped with margin, traceable to its batch entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedFace {
    pub face: ScoredFace,
    /// Margin-expanded, image-clamped crop box.
    pub crop: Region,
    pub output: FaceOutput,
    /// Position of the originating source in the batch.
    pub source_index: usize,
    /// The originating source descriptor as supplied by the caller.
    pub source: String,
}

impl ExtractedFace {
    pub fn storage_path(&self) -> Option<&Path> {
        match &self.output {
            FaceOutput::Stored(path) => Some(path),
            FaceOutput::Inline(_) => None,
        }
    }

    pub fn inline_payload(&self) -> Option<&str> {
        match &self.output {
            FaceOutput::Inline(payload) => Some(payload),
            FaceOutput::Stored(_) => None,
        }
    }
}
