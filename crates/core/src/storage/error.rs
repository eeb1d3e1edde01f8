//! Storage error types.

use std::time::Duration;

use thiserror::Error;

/// Configuration could not be resolved. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    /// Endpoint is not an absolute http(s) URL.
    #[error("invalid storage endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Key prefix would be rewritten by path normalization in the store.
    #[error("invalid key prefix '{prefix}': {reason}")]
    InvalidKeyPrefix {
        /// Prefix as configured.
        prefix: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// CDN host must be a bare hostname.
    #[error("invalid CDN host '{0}': expected a bare hostname")]
    InvalidCdnHost(String),

    /// Storage backend rejected the configuration.
    #[error("storage configuration error: {0}")]
    Backend(String),

    /// Avatar generator template is not an http(s) URL.
    #[error("invalid avatar generator URL: {0}")]
    AvatarTemplate(String),

    /// HTTP client for mirroring could not be built.
    #[error("http client configuration error: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Create an invalid endpoint error.
    #[must_use]
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single put attempt against the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store refused the credentials or the bucket policy.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend configuration was rejected when preparing the request.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Attempt did not finish within the per-attempt timeout.
    #[error("put object timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport or protocol failure.
    #[error("put object failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

impl From<opendal::Error> for StoreError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }
}

/// Upload did not reach the store.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Every attempt in the retry budget failed.
    #[error("upload failed after {attempts} attempts: {source}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Failure of the last attempt.
        #[source]
        source: StoreError,
    },

    /// Declared size and body length disagree.
    #[error("declared size {declared} bytes does not match body length {actual} bytes")]
    SizeMismatch {
        /// Size given by the caller.
        declared: u64,
        /// Length of the materialized body.
        actual: u64,
    },

    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    TooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Upload target is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl UploadError {
    /// Number of attempts made before giving up, if any were made.
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Fetching a remote resource failed. Never retried.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Source is not an absolute http(s) URL.
    #[error("invalid source URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Source host is outside the configured allowlist.
    #[error("host '{0}' is not allowed as a mirror source")]
    HostNotAllowed(String),

    /// Connection, TLS, timeout or body read failure.
    #[error("download failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Origin answered with something other than 200.
    #[error("failed to download, status code: {0}")]
    Status(u16),

    /// Remote body is larger than the configured cap.
    #[error("remote body exceeds maximum of {max} bytes")]
    TooLarge {
        /// Configured cap in bytes.
        max: u64,
    },
}

impl DownloadError {
    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// True when the request never produced a usable response.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Status code of a rejected response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Mirror failed at one of its two stages.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Fetching the source failed.
    #[error("download: {0}")]
    Download(#[from] DownloadError),

    /// Storing the fetched bytes failed.
    #[error("upload: {0}")]
    Upload(#[from] UploadError),
}

impl MirrorError {
    /// Stage that failed: `"download"` or `"upload"`.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Download(_) => "download",
            Self::Upload(_) => "upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_reports_attempts_and_cause() {
        let err = UploadError::Exhausted {
            attempts: 5,
            source: StoreError::operation("connection reset"),
        };
        assert_eq!(err.attempts(), Some(5));
        assert_eq!(
            err.to_string(),
            "upload failed after 5 attempts: put object failed: connection reset"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("put object failed: connection reset"));
    }

    #[test]
    fn test_mirror_stage_labels() {
        let download = MirrorError::from(DownloadError::Status(404));
        assert_eq!(download.stage(), "download");
        assert_eq!(
            download.to_string(),
            "download: failed to download, status code: 404"
        );

        let upload = MirrorError::from(UploadError::SizeMismatch {
            declared: 1,
            actual: 2,
        });
        assert_eq!(upload.stage(), "upload");
    }

    #[test]
    fn test_download_error_classification() {
        let status = DownloadError::Status(503);
        assert_eq!(status.status(), Some(503));
        assert!(!status.is_transport());

        let too_large = DownloadError::TooLarge { max: 10 };
        assert_eq!(too_large.status(), None);
    }

    #[test]
    fn test_opendal_error_mapping() {
        let denied = opendal::Error::new(opendal::ErrorKind::PermissionDenied, "no");
        assert!(matches!(
            StoreError::from(denied),
            StoreError::PermissionDenied(_)
        ));

        let unexpected = opendal::Error::new(opendal::ErrorKind::Unexpected, "boom");
        assert!(matches!(StoreError::from(unexpected), StoreError::Operation(_)));
    }
}
