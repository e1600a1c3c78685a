use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::infrastructure::rustface_detector::DetectionModel;
use crate::shared::constants::{APP_DIR_NAME, MODEL_FILE_NAME, SYSTEM_MODEL_DIRS};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("unable to load face detection model (tried: {})", tried.join("; "))]
    Unavailable { tried: Vec<String> },
    #[error("failed to create model directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine user data directory")]
    NoDataDir,
}

type LoadFn<'a, T> = Box<dyn FnOnce() -> Result<T, String> + 'a>;

/// One place a model might live. Its loader runs only if every earlier
/// candidate failed.
pub struct Candidate<'a, T> {
    label: String,
    load: LoadFn<'a, T>,
}

impl<'a, T> Candidate<'a, T> {
    pub fn new(label: impl Into<String>, load: impl FnOnce() -> Result<T, String> + 'a) -> Self {
        Self {
            label: label.into(),
            load: Box::new(load),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Evaluates candidates in order and returns the first successful load.
///
/// Failed candidates are logged and skipped; later candidates are never
/// touched once one succeeds.
pub fn resolve_first<T>(candidates: Vec<Candidate<'_, T>>) -> Result<T, ModelResolveError> {
    let mut tried = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match (candidate.load)() {
            Ok(model) => {
                log::info!("Loaded face detection model from {}", candidate.label);
                return Ok(model);
            }
            Err(reason) => {
                log::debug!("Skipping model candidate {}: {reason}", candidate.label);
                tried.push(candidate.label);
            }
        }
    }
    Err(ModelResolveError::Unavailable { tried })
}

/// Caller-provided additions to the built-in model search.
#[derive(Clone, Debug, Default)]
pub struct ModelLocations {
    /// Tried before every built-in location.
    pub explicit: Option<PathBuf>,
    /// Downloaded into the user data directory when nothing else loads.
    pub download_url: Option<String>,
}

/// Builds the candidate list, in priority order:
///
/// 1. explicit path, if configured
/// 2. `MODEL_FILE_NAME` in the process working directory
/// 3. the per-user data directory (skipped when it cannot be determined)
/// 4. each of [`SYSTEM_MODEL_DIRS`]
/// 5. download from `download_url`, if configured
pub fn detection_model_candidates(locations: &ModelLocations) -> Vec<Candidate<'_, DetectionModel>> {
    let mut candidates = Vec::new();

    if let Some(path) = &locations.explicit {
        candidates.push(Candidate::new(path.display().to_string(), move || {
            DetectionModel::load(path)
        }));
    }

    candidates.push(at_computed_path("working directory", || {
        std::env::current_dir()
            .ok()
            .map(|dir| dir.join(MODEL_FILE_NAME))
    }));

    candidates.push(at_computed_path("user data directory", || {
        model_data_dir().ok().map(|dir| dir.join(MODEL_FILE_NAME))
    }));

    for dir in SYSTEM_MODEL_DIRS {
        let path = Path::new(dir).join(MODEL_FILE_NAME);
        candidates.push(Candidate::new(path.display().to_string(), move || {
            DetectionModel::load(&path)
        }));
    }

    if let Some(url) = &locations.download_url {
        candidates.push(Candidate::new(format!("download from {url}"), move || {
            let dest = model_data_dir()
                .map_err(|e| e.to_string())?
                .join(MODEL_FILE_NAME);
            fetch_model(url, &dest).map_err(|e| e.to_string())?;
            DetectionModel::load(&dest)
        }));
    }

    candidates
}

/// Resolves the detection model once for a batch.
pub fn resolve(locations: &ModelLocations) -> Result<DetectionModel, ModelResolveError> {
    resolve_first(detection_model_candidates(locations))
}

fn at_computed_path<'a>(
    label: &str,
    compute: impl FnOnce() -> Option<PathBuf> + 'a,
) -> Candidate<'a, DetectionModel> {
    let label = label.to_string();
    let unavailable = format!("{label} unavailable");
    Candidate::new(label, move || {
        let path = compute().ok_or(unavailable)?;
        DetectionModel::load(&path)
    })
}

/// Per-user model directory.
///
/// - macOS: `~/Library/Application Support/facecrop/models/`
/// - Linux: `$XDG_DATA_HOME/facecrop/models/` or `~/.local/share/facecrop/models/`
/// - Windows: `%APPDATA%/facecrop/models/`
pub fn model_data_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoDataDir)
}

fn fetch_model(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(ModelResolveError::CacheDir)?;
    }
    log::info!("Downloading face detection model from {url}");
    download(url, dest)
}

fn download(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(url: &str, dest: &Path, temp_path: &Path) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let write_err = |e: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
