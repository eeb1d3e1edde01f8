//! Remote mirroring: fetch a URL, store its bytes, serve them from the CDN.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use rehost_shared::MirrorConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use tracing::{debug, info};

use super::client::ObjectStore;
use super::error::{ConfigError, DownloadError, MirrorError};
use super::service::{UploadResult, UploadService};

const MAX_REDIRECTS: usize = 10;

/// Fetched remote body and its declared content type.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    /// Response body.
    pub body: Bytes,
    /// `Content-Type` header verbatim, empty when absent.
    pub content_type: String,
}

/// Bounded HTTP fetcher for mirror sources.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    max_content_length: u64,
    allowed_hosts: Arc<[String]>,
}

impl Downloader {
    /// Build a downloader.
    ///
    /// An empty `allowed_hosts` accepts any host. Otherwise both the source
    /// and every redirect target must be listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        timeout: Duration,
        max_content_length: u64,
        allowed_hosts: Vec<String>,
        user_agent: &str,
    ) -> Result<Self, ConfigError> {
        let allowed_hosts: Arc<[String]> = allowed_hosts.into();
        let redirect_hosts = Arc::clone(&allowed_hosts);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::custom(move |attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else if host_allowed(&redirect_hosts, attempt.url().host_str()) {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            max_content_length,
            allowed_hosts,
        })
    }

    /// Build a downloader from the mirror section of the app configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &MirrorConfig) -> Result<Self, ConfigError> {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            config.max_content_length,
            config.allowed_hosts.clone(),
            &config.user_agent,
        )
    }

    /// GET `source` and buffer its body, up to the configured cap.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid or disallowed URL, a transport
    /// failure, any status other than 200, or a body over the cap.
    pub async fn fetch(&self, source: &str) -> Result<RemoteObject, DownloadError> {
        let url = self.check_source(source)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DownloadError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let max = self.max_content_length;
        let declared = response.content_length();
        if declared.is_some_and(|len| len > max) {
            return Err(DownloadError::TooLarge { max });
        }

        // Header values may carry opaque bytes; keep them rather than dropping the type.
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        let capacity = usize::try_from(declared.unwrap_or(0).min(max)).unwrap_or(0);
        let mut body = BytesMut::with_capacity(capacity);
        while let Some(chunk) = response.chunk().await.map_err(DownloadError::Transport)? {
            let total = u64::try_from(body.len() + chunk.len()).unwrap_or(u64::MAX);
            if total > max {
                return Err(DownloadError::TooLarge { max });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(source, size = body.len(), content_type = %content_type, "downloaded remote object");
        Ok(RemoteObject {
            body: body.freeze(),
            content_type,
        })
    }

    fn check_source(&self, source: &str) -> Result<Url, DownloadError> {
        let url =
            Url::parse(source).map_err(|e| DownloadError::invalid_url(source, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(
                source,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        let Some(host) = url.host_str() else {
            return Err(DownloadError::invalid_url(source, "missing host"));
        };
        if !host_allowed(&self.allowed_hosts, Some(host)) {
            return Err(DownloadError::HostNotAllowed(host.to_string()));
        }
        Ok(url)
    }
}

fn host_allowed(allowed: &[String], host: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    host.is_some_and(|host| allowed.iter().any(|h| h.eq_ignore_ascii_case(host)))
}

/// Re-hosts remote resources in the owned store.
pub struct RemoteMirror<S> {
    downloader: Downloader,
    uploads: Arc<UploadService<S>>,
}

impl<S: ObjectStore> RemoteMirror<S> {
    /// Create a mirror that stores through `uploads`.
    #[must_use]
    pub fn new(downloader: Downloader, uploads: Arc<UploadService<S>>) -> Self {
        Self {
            downloader,
            uploads,
        }
    }

    /// Fetch `source` and store it under a fresh key ending in `extension`.
    ///
    /// Download failures are never retried and never reach the store.
    /// Upload failures have already been retried by the uploader.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Download`] or [`MirrorError::Upload`].
    pub async fn mirror(&self, source: &str, extension: &str) -> Result<UploadResult, MirrorError> {
        let remote = self.downloader.fetch(source).await?;
        let size = u64::try_from(remote.body.len()).unwrap_or(u64::MAX);

        let result = self
            .uploads
            .store_bytes(
                remote.body,
                size,
                Some(remote.content_type),
                Some(extension),
            )
            .await?;

        info!(source, key = %result.key, size, "mirrored remote object");
        Ok(result)
    }
}
