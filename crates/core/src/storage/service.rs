//! Direct upload path: key, put, public URL.

use std::sync::Arc;

use bytes::Bytes;
use rehost_shared::UploadConfig;

use super::client::ObjectStore;
use super::error::{ConfigError, UploadError};
use super::key::{KeyPrefix, StorageKey};
use super::uploader::Uploader;
use super::url::public_url;

/// Content to store, already materialized in memory.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Object body.
    pub body: Bytes,
    /// Declared size in bytes. Must equal `body.len()`.
    pub size: u64,
    /// MIME type, if known.
    pub content_type: Option<String>,
    /// Extension for the key, with its leading dot.
    pub extension: Option<String>,
}

impl UploadRequest {
    /// Request whose declared size is the body length.
    #[must_use]
    pub fn new(body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            size: u64::try_from(body.len()).unwrap_or(u64::MAX),
            body,
            content_type: None,
            extension: None,
        }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the key extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// A stored object and where it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Public URL of the object.
    pub url: String,
    /// Key the object was written under.
    pub key: StorageKey,
    /// Stored size in bytes.
    pub size: u64,
    /// Content type sent with the object.
    pub content_type: Option<String>,
}

/// Where and how uploads are stored. Immutable after startup.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    bucket: String,
    cdn_host: String,
    key_prefix: KeyPrefix,
    max_file_size: u64,
}

impl UploadTarget {
    /// Validate an upload target.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket or CDN host is empty, or the CDN host
    /// is not a bare hostname.
    pub fn new(
        bucket: impl Into<String>,
        cdn_host: impl Into<String>,
        key_prefix: KeyPrefix,
        max_file_size: u64,
    ) -> Result<Self, ConfigError> {
        let bucket = bucket.into();
        let cdn_host = cdn_host.into();

        if bucket.is_empty() {
            return Err(ConfigError::Missing("storage.bucket"));
        }
        if cdn_host.is_empty() {
            return Err(ConfigError::Missing("upload.cdn_host"));
        }
        if cdn_host.contains("://") || cdn_host.contains('/') {
            return Err(ConfigError::InvalidCdnHost(cdn_host));
        }

        Ok(Self {
            bucket,
            cdn_host,
            key_prefix,
            max_file_size,
        })
    }

    /// Build the target from the upload section and the bucket name.
    ///
    /// # Errors
    ///
    /// Same as [`UploadTarget::new`], plus an empty key prefix.
    pub fn from_config(config: &UploadConfig, bucket: &str) -> Result<Self, ConfigError> {
        Self::new(
            bucket,
            &config.cdn_host,
            KeyPrefix::new(&config.key_prefix)?,
            config.max_file_size,
        )
    }

    /// Bucket uploads go to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// CDN hostname used for public URLs.
    #[must_use]
    pub fn cdn_host(&self) -> &str {
        &self.cdn_host
    }
}

/// Upload pipeline over an [`ObjectStore`].
pub struct UploadService<S> {
    store: Arc<S>,
    uploader: Uploader,
    target: UploadTarget,
}

impl<S: ObjectStore> UploadService<S> {
    /// Create a new upload service.
    #[must_use]
    pub fn new(store: Arc<S>, uploader: Uploader, target: UploadTarget) -> Self {
        Self {
            store,
            uploader,
            target,
        }
    }

    /// Store a caller-supplied body and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the body exceeds the configured size limit or
    /// every attempt fails.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResult, UploadError> {
        if request.size > self.target.max_file_size {
            return Err(UploadError::TooLarge {
                size: request.size,
                max: self.target.max_file_size,
            });
        }

        self.store_bytes(
            request.body,
            request.size,
            request.content_type,
            request.extension.as_deref(),
        )
        .await
    }

    /// Generate a key once and put the body under it.
    pub(crate) async fn store_bytes(
        &self,
        body: Bytes,
        size: u64,
        content_type: Option<String>,
        extension: Option<&str>,
    ) -> Result<UploadResult, UploadError> {
        let key = StorageKey::generate(&self.target.key_prefix, extension);
        let content_type = content_type.filter(|ct| !ct.is_empty());

        self.uploader
            .put(
                self.store.as_ref(),
                &self.target.bucket,
                &key,
                body,
                size,
                content_type.as_deref(),
            )
            .await?;

        Ok(UploadResult {
            url: public_url(&self.target.cdn_host, key.as_str()),
            key,
            size,
            content_type,
        })
    }

    /// Upload target in use.
    #[must_use]
    pub fn target(&self) -> &UploadTarget {
        &self.target
    }
}
