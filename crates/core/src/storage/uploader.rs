//! Single logical put with bounded retry.

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::client::ObjectStore;
use super::error::{ConfigError, StoreError, UploadError};
use super::key::StorageKey;
use super::retry::RetryPolicy;

/// Writes one object, retrying the whole attempt under a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Uploader {
    policy: RetryPolicy,
}

impl Uploader {
    /// Create an uploader with the given retry policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Retry policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Write `body` to `bucket` under `key`.
    ///
    /// Attempts run strictly in sequence against the same key, so a retry
    /// overwrites rather than duplicates. The body is re-presented as-is on
    /// every attempt. An empty content type is sent as none.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::SizeMismatch`] before any attempt if `size`
    /// differs from the body length, and [`UploadError::Exhausted`] once
    /// the attempt budget is spent.
    pub async fn put<S: ObjectStore>(
        &self,
        store: &S,
        bucket: &str,
        key: &StorageKey,
        body: Bytes,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<(), UploadError> {
        if bucket.is_empty() {
            return Err(ConfigError::Missing("storage.bucket").into());
        }
        let actual = u64::try_from(body.len()).unwrap_or(u64::MAX);
        if actual != size {
            return Err(UploadError::SizeMismatch {
                declared: size,
                actual,
            });
        }

        let content_type = content_type.filter(|ct| !ct.is_empty());
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%key, bucket, attempt, max_attempts, size, "putting object");

            match self.attempt(store, bucket, key, body.clone(), content_type).await {
                Ok(()) => {
                    info!(%key, bucket, attempt, size, "object stored");
                    return Ok(());
                }
                Err(err) if attempt >= max_attempts => {
                    warn!(%key, bucket, attempt, error = %err, "put attempt failed, giving up");
                    return Err(UploadError::Exhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        %key,
                        bucket,
                        attempt,
                        error = %err,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "put attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn attempt<S: ObjectStore>(
        &self,
        store: &S,
        bucket: &str,
        key: &StorageKey,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let put = store.put_object(bucket, key.as_str(), body, content_type);
        match self.policy.attempt_timeout() {
            Some(limit) => tokio::time::timeout(limit, put)
                .await
                .unwrap_or(Err(StoreError::Timeout(limit))),
            None => put.await,
        }
    }
}
