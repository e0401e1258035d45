use crate::constants::{
    BODY_PREVIEW_LEN, MAX_RELEASE_BODY_LEN, MIN_RELEASE_BODY_LEN, RELEASE_TAG_MARKER,
};
use crate::core::FetchError;
use std::time::Duration;
use tracing::debug;

/// Build the HTTP client shared by the fetcher and the downloader.
///
/// The timeout bounds the whole request, body included. Redirects are
/// followed (release assets are served through one).
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("walcman-updater/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// First characters of `body`, for diagnostics.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LEN).collect()
}

/// Retrieves the raw "latest release" document.
///
/// One GET per check, no retries: the throttle gate decides when the next
/// attempt happens.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::upgrade::release::ReleaseFetcher;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let fetcher = ReleaseFetcher::new(
///     "https://api.github.com/repos/lassedtu/walcman/releases/latest",
///     Duration::from_secs(5),
/// )?;
/// let body = fetcher.fetch_latest().await?;
/// println!("{} bytes of release metadata", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ReleaseFetcher {
    /// Fetcher for `url`, every request bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// [`FetchError::Client`] when the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout).map_err(FetchError::Client)?,
            url: url.into(),
            timeout,
        })
    }

    /// URL this fetcher queries.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the release document and sanity-check it.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] / [`FetchError::Request`] on transport failure
    /// - [`FetchError::Status`] on a non-success status
    /// - [`FetchError::TooLarge`] past the 4 MiB cap
    /// - [`FetchError::Malformed`] when the body is shorter than 50 bytes or
    ///   lacks the `tag_name` marker
    pub async fn fetch_latest(&self) -> Result<String, FetchError> {
        debug!("Fetching release metadata from {}", self.url);

        let mut response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let mut buffer = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            if buffer.len() + chunk.len() > MAX_RELEASE_BODY_LEN {
                return Err(FetchError::TooLarge {
                    limit: MAX_RELEASE_BODY_LEN,
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&buffer).into_owned();
        debug!("Received {} bytes of release metadata", body.len());

        if body.len() < MIN_RELEASE_BODY_LEN || !body.contains(RELEASE_TAG_MARKER) {
            return Err(FetchError::Malformed {
                len: body.len(),
                preview: preview(&body),
            });
        }

        Ok(body)
    }

    fn transport_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: self.url.clone(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Request {
                url: self.url.clone(),
                source: error,
            }
        }
    }
}
