use std::fmt;
use std::path::PathBuf;

use base64::Engine;
use thiserror::Error;

use crate::shared::constants::{INLINE_DATA_PREFIX, URL_SCHEMES};

/// Why an image source could not be turned into a decoded raster.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("malformed source: {0}")]
    Malformed(String),
    #[error("failed to decode image: {0}")]
    DecodeFailed(String),
}

/// Where the bytes of one batch entry come from.
///
/// Built once per entry from the caller's string by prefix inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    LocalPath(PathBuf),
    RemoteUrl(String),
    InlineData { mime_type: String, bytes: Vec<u8> },
}

impl ImageSource {
    /// Classifies a source descriptor.
    ///
    /// Order: `data:image/` marker, then `http://`/`https://`, then local path.
    /// Inline payloads are decoded here, so malformed base64 surfaces as
    /// [`SourceError::Malformed`] before any I/O happens.
    pub fn parse(descriptor: &str) -> Result<Self, SourceError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(SourceError::Malformed("empty source".to_string()));
        }

        if descriptor.starts_with(INLINE_DATA_PREFIX) {
            return parse_inline(descriptor);
        }

        if URL_SCHEMES.iter().any(|scheme| descriptor.starts_with(scheme)) {
            return Ok(Self::RemoteUrl(descriptor.to_string()));
        }

        Ok(Self::LocalPath(PathBuf::from(descriptor)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::LocalPath(_) => "local file",
            Self::RemoteUrl(_) => "URL",
            Self::InlineData { .. } => "inline data",
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPath(path) => write!(f, "{}", path.display()),
            Self::RemoteUrl(url) => write!(f, "{url}"),
            Self::InlineData { mime_type, bytes } => {
                write!(f, "data:{mime_type} ({} bytes)", bytes.len())
            }
        }
    }
}

fn parse_inline(descriptor: &str) -> Result<ImageSource, SourceError> {
    let header_end = descriptor.find(',');
    let payload = match header_end {
        Some(idx) => &descriptor[idx + 1..],
        // No separator: treat the whole string as payload.
        None => descriptor,
    };

    let header = header_end.map_or(descriptor, |idx| &descriptor[..idx]);
    let mime_type = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string();

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SourceError::Malformed(format!("invalid base64 payload: {e}")))?;

    Ok(ImageSource::InlineData { mime_type, bytes })
}
