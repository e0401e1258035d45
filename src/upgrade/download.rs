use crate::constants::MIN_ARTIFACT_SIZE;
use crate::core::DownloadError;
use crate::upgrade::release::http_client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Downloads an update artifact to a temporary path.
///
/// The transfer is bounded by the same timeout as the metadata fetch. After
/// the transfer the file is re-read from disk and rejected when it is below
/// the plausibility threshold (50,000 bytes by default): at that size it is
/// an error page or a truncated transfer, not a build. A rejected or failed
/// download never leaves a partial file behind.
#[derive(Debug, Clone)]
pub struct ArtifactDownloader {
    client: reqwest::Client,
    timeout: Duration,
    min_size: u64,
}

impl ArtifactDownloader {
    /// Downloader with the given timeout and the default size threshold.
    ///
    /// # Errors
    ///
    /// [`DownloadError::Client`] when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        Ok(Self {
            client: http_client(timeout).map_err(DownloadError::Client)?,
            timeout,
            min_size: MIN_ARTIFACT_SIZE,
        })
    }

    /// Override the minimum accepted size.
    #[must_use]
    pub const fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Download `url` to `dest`, returning the number of bytes on disk.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Timeout`] / [`DownloadError::Request`] on transport failure
    /// - [`DownloadError::Status`] on a non-success status
    /// - [`DownloadError::Io`] when `dest` cannot be written or re-read
    /// - [`DownloadError::Undersized`] when the result is implausibly small
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        info!("Downloading update from {url}");

        let result = self.transfer(url, dest).await;
        let size = match result {
            Ok(()) => self.verify_size(dest).await,
            Err(e) => Err(e),
        };

        if size.is_err() {
            discard(dest).await;
        }
        size
    }

    async fn transfer(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let mut response =
            self.client.get(url).send().await.map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let io_error = |source| DownloadError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let mut file = fs::File::create(dest).await.map_err(io_error)?;
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(url, e))? {
            file.write_all(&chunk).await.map_err(io_error)?;
        }
        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;

        Ok(())
    }

    async fn verify_size(&self, dest: &Path) -> Result<u64, DownloadError> {
        let size = fs::metadata(dest)
            .await
            .map_err(|source| DownloadError::Io {
                path: dest.to_path_buf(),
                source,
            })?
            .len();

        if size < self.min_size {
            warn!("Downloaded artifact is only {size} bytes");
            return Err(DownloadError::Undersized {
                size,
                minimum: self.min_size,
            });
        }

        debug!("Downloaded {size} bytes to {}", dest.display());
        Ok(size)
    }

    fn transport_error(&self, url: &str, error: reqwest::Error) -> DownloadError {
        if error.is_timeout() {
            DownloadError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            DownloadError::Request {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove partial download {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestResponse, TestServer};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_download_rejects_tiny_body() {
        let server = TestServer::start(vec![("/bin", TestResponse::ok(vec![b'x'; 10]))])
            .await
            .unwrap();
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("walcman.update");

        let downloader = ArtifactDownloader::new(Duration::from_secs(5)).unwrap();
        let err = downloader.download(&server.url("/bin"), &dest).await.unwrap_err();

        assert!(matches!(
            err,
            DownloadError::Undersized {
                size: 10,
                minimum: 50_000
            }
        ));
        assert!(!dest.exists(), "undersized download must not be left behind");
    }

    #[tokio::test]
    async fn test_download_accepts_one_megabyte() {
        let payload = vec![0x7f; 1024 * 1024];
        let server = TestServer::start(vec![("/bin", TestResponse::ok(payload.clone()))])
            .await
            .unwrap();
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("walcman.update");

        let downloader = ArtifactDownloader::new(Duration::from_secs(5)).unwrap();
        let size = downloader.download(&server.url("/bin"), &dest).await.unwrap();

        assert_eq!(size, payload.len() as u64);
        assert_eq!(fs::read(&dest).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_download_bad_status() {
        let server = TestServer::start(vec![]).await.unwrap();
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("walcman.update");

        let downloader = ArtifactDownloader::new(Duration::from_secs(5)).unwrap();
        let err = downloader.download(&server.url("/missing"), &dest).await.unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let server = TestServer::start(vec![("/bin", TestResponse::ok(vec![1u8; 64]))])
            .await
            .unwrap();
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("walcman.update");

        let downloader = ArtifactDownloader::new(Duration::from_secs(5)).unwrap().with_min_size(64);
        assert_eq!(downloader.download(&server.url("/bin"), &dest).await.unwrap(), 64);
    }
}
