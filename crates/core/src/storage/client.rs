//! S3-compatible client built on Apache OpenDAL.

use std::future::Future;

use bytes::Bytes;
use opendal::{Operator, services};
use rehost_shared::StorageConfig;
use reqwest::Url;

use super::error::{ConfigError, StoreError};

/// Write primitive the uploader retries against.
///
/// Implemented by [`S3Client`] for real stores and by in-memory doubles in tests.
pub trait ObjectStore: Send + Sync {
    /// Write `body` to `bucket` under `key`, overwriting any existing object.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone)]
pub struct ClientConfig {
    endpoint: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Client bound to one endpoint and one static credential pair.
#[derive(Debug, Clone)]
pub struct S3Client {
    config: ClientConfig,
}

impl S3Client {
    /// Build a client for a custom S3-compatible endpoint.
    ///
    /// Credentials are used as given; nothing is read from the environment,
    /// profile files or instance metadata. Requests use path-style
    /// addressing, so the endpoint hostname is never rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute http(s) URL or
    /// any other value is empty.
    pub fn build(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = ClientConfig {
            endpoint: endpoint.into(),
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        };

        validate_endpoint(&config.endpoint)?;
        if config.region.is_empty() {
            return Err(ConfigError::Missing("storage.region"));
        }
        if config.access_key_id.is_empty() {
            return Err(ConfigError::Missing("storage.access_key_id"));
        }
        if config.secret_access_key.is_empty() {
            return Err(ConfigError::Missing("storage.secret_access_key"));
        }

        Ok(Self { config })
    }

    /// Build a client from the storage section of the app configuration.
    ///
    /// # Errors
    ///
    /// Same as [`S3Client::build`].
    pub fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        Self::build(
            &config.endpoint,
            &config.region,
            &config.access_key_id,
            &config.secret_access_key,
        )
    }

    /// Endpoint this client writes to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Create an OpenDAL operator for a bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if OpenDAL rejects the configuration.
    pub fn operator(&self, bucket: &str) -> Result<Operator, ConfigError> {
        if bucket.is_empty() {
            return Err(ConfigError::Missing("storage.bucket"));
        }

        let builder = services::S3::default()
            .endpoint(&self.config.endpoint)
            .bucket(bucket)
            .region(&self.config.region)
            .access_key_id(&self.config.access_key_id)
            .secret_access_key(&self.config.secret_access_key)
            .disable_config_load()
            .disable_ec2_metadata();

        Ok(Operator::new(builder)
            .map_err(|e| ConfigError::Backend(e.to_string()))?
            .finish())
    }
}

impl ObjectStore for S3Client {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let operator = self
            .operator(bucket)
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        let mut write = operator.write_with(key, body);
        if let Some(content_type) = content_type {
            write = write.content_type(content_type);
        }
        write.await?;
        Ok(())
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    if endpoint.is_empty() {
        return Err(ConfigError::Missing("storage.endpoint"));
    }
    let url =
        Url::parse(endpoint).map_err(|e| ConfigError::invalid_endpoint(endpoint, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_endpoint(
            endpoint,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::invalid_endpoint(endpoint, "missing host"));
    }
    Ok(())
}
