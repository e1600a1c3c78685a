use std::fs;
use std::time::Duration;

use crate::shared::constants::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::shared::decoded_image::DecodedImage;
use crate::source::domain::image_loader::ImageLoader;
use crate::source::domain::image_source::{ImageSource, SourceError};

/// Resolves local files, HTTP(S) URLs and inline data into RGB rasters.
///
/// Remote fetches use a single blocking client with a per-request timeout.
/// A timeout is reported as [`SourceError::Unreachable`] and never retried.
pub struct SourceResolver {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl SourceResolver {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn with_default_timeout() -> Result<Self, reqwest::Error> {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        log::debug!("Fetching {url} (timeout {:?})", self.timeout);
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::Unreachable(describe_http_error(url, &e)))?;

        let bytes = response
            .bytes()
            .map_err(|e| SourceError::Unreachable(describe_http_error(url, &e)))?;
        Ok(bytes.to_vec())
    }
}

impl ImageLoader for SourceResolver {
    fn load(&self, source: &ImageSource) -> Result<DecodedImage, SourceError> {
        match source {
            ImageSource::LocalPath(path) => {
                let bytes = fs::read(path).map_err(|e| {
                    SourceError::Unreachable(format!("{}: {e}", path.display()))
                })?;
                decode(&bytes)
            }
            ImageSource::RemoteUrl(url) => decode(&self.fetch(url)?),
            ImageSource::InlineData { bytes, .. } => decode(bytes),
        }
    }
}

/// Decodes encoded image bytes (format sniffed from content) into RGB.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, SourceError> {
    if bytes.is_empty() {
        return Err(SourceError::DecodeFailed("no image data".to_string()));
    }
    let image =
        image::load_from_memory(bytes).map_err(|e| SourceError::DecodeFailed(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(SourceError::DecodeFailed(
            "image dimensions are zero".to_string(),
        ));
    }
    Ok(DecodedImage::from_rgb(image.into_rgb8()))
}

fn describe_http_error(url: &str, e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("{url}: request timed out")
    } else if let Some(status) = e.status() {
        format!("{url}: HTTP {status}")
    } else {
        format!("{url}: {e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([50, 100, 200]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn write_png(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("test.png");
        fs::write(&path, png_bytes(width, height)).unwrap();
        path
    }

    /// Serves a single HTTP response on a loopback port and returns its URL.
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let header = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{addr}/image.png")
    }

    fn resolver() -> SourceResolver {
        SourceResolver::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 40, 30);
        let image = resolver().load(&ImageSource::LocalPath(path)).unwrap();
        assert_eq!((image.width(), image.height()), (40, 30));
        assert_eq!(&image.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_load_missing_file_is_unreachable() {
        let err = resolver()
            .load(&ImageSource::LocalPath(PathBuf::from("/nonexistent/face.png")))
            .unwrap_err();
        assert!(matches!(err, SourceError::Unreachable(_)));
    }

    #[test]
    fn test_load_non_image_file_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        fs::write(&path, b"definitely not a png").unwrap();
        let err = resolver().load(&ImageSource::LocalPath(path)).unwrap_err();
        assert!(matches!(err, SourceError::DecodeFailed(_)));
    }

    #[test]
    fn test_load_empty_file_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        fs::write(&path, b"").unwrap();
        let err = resolver().load(&ImageSource::LocalPath(path)).unwrap_err();
        assert!(matches!(err, SourceError::DecodeFailed(_)));
    }

    #[test]
    fn test_load_inline_data() {
        let source = ImageSource::InlineData {
            mime_type: "image/png".to_string(),
            bytes: png_bytes(8, 6),
        };
        let image = resolver().load(&source).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }

    #[test]
    fn test_load_inline_garbage_is_decode_failure() {
        let source = ImageSource::InlineData {
            mime_type: "image/png".to_string(),
            bytes: b"hello".to_vec(),
        };
        assert!(matches!(
            resolver().load(&source).unwrap_err(),
            SourceError::DecodeFailed(_)
        ));
    }

    #[test]
    fn test_load_remote_url() {
        let url = serve_once("200 OK", png_bytes(12, 10));
        let image = resolver().load(&ImageSource::RemoteUrl(url)).unwrap();
        assert_eq!((image.width(), image.height()), (12, 10));
    }

    #[test]
    fn test_load_remote_http_error_is_unreachable() {
        let url = serve_once("404 Not Found", Vec::new());
        let err = resolver().load(&ImageSource::RemoteUrl(url)).unwrap_err();
        let SourceError::Unreachable(message) = err else {
            panic!("expected unreachable");
        };
        assert!(message.contains("404"));
    }

    #[test]
    fn test_load_refused_connection_is_unreachable() {
        // Bind then drop to get a port nobody is listening on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{port}/face.png");
        let err = resolver().load(&ImageSource::RemoteUrl(url)).unwrap_err();
        assert!(matches!(err, SourceError::Unreachable(_)));
    }

    #[test]
    fn test_slow_server_times_out_as_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            // Accept and hold the connection open without answering.
            let conn = listener.accept();
            std::thread::sleep(Duration::from_secs(2));
            drop(conn);
        });

        let resolver = SourceResolver::new(Duration::from_millis(300)).unwrap();
        let err = resolver
            .load(&ImageSource::RemoteUrl(format!("http://{addr}/slow.png")))
            .unwrap_err();
        assert!(matches!(err, SourceError::Unreachable(_)));
        handle.join().unwrap();
    }

    #[test]
    fn test_default_timeout_is_thirty_seconds() {
        let resolver = SourceResolver::with_default_timeout().unwrap();
        assert_eq!(resolver.timeout(), Duration::from_secs(30));
    }
}
