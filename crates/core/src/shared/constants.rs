/// File name of the SeetaFace frontal face cascade loaded by `rustface`.
pub const MODEL_FILE_NAME: &str = "seeta_fd_frontal_v1.0.bin";

/// Application directory name under the per-user data directory.
pub const APP_DIR_NAME: &str = "facecrop";

/// Well-known system install locations, tried after the working directory
/// and the per-user data directory.
pub const SYSTEM_MODEL_DIRS: &[&str] = &[
    "/usr/share/rustface",
    "/usr/local/share/rustface",
    "/opt/homebrew/share/rustface",
];

/// Smallest face (in pixels) the SeetaFace cascade can be configured for.
pub const MIN_SUPPORTED_FACE_SIZE: u32 = 20;

pub const DEFAULT_MIN_FACE_SIZE: u32 = 80;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MARGIN: f64 = 0.10;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Sharpness value that maps to confidence 1.0.
pub const SHARPNESS_NORMALIZATION: f64 = 500.0;

pub const INLINE_DATA_PREFIX: &str = "data:image/";
pub const URL_SCHEMES: &[&str] = &["http://", "https://"];
