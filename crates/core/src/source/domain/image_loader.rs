use crate::shared::decoded_image::DecodedImage;
use crate::source::domain::image_source::{ImageSource, SourceError};

/// Turns a classified source into a decoded raster.
///
/// Implementations must be shareable across batch workers and must not
/// cache bytes between calls.
pub trait ImageLoader: Send + Sync {
    fn load(&self, source: &ImageSource) -> Result<DecodedImage, SourceError>;
}
