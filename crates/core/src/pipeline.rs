//! Startup wiring from [`AppConfig`] to ready-to-use services.

use std::sync::Arc;

use rehost_shared::AppConfig;
use tracing::info;

use crate::avatar::AvatarService;
use crate::storage::{
    ConfigError, Downloader, RemoteMirror, RetryPolicy, S3Client, UploadService, UploadTarget,
    Uploader,
};

/// Every service the pipeline exposes, built once and shared read-only.
pub struct Pipeline {
    /// Direct uploads.
    pub uploads: Arc<UploadService<S3Client>>,
    /// Remote mirroring.
    pub mirror: Arc<RemoteMirror<S3Client>>,
    /// Avatar provisioning, when a generator is configured.
    pub avatars: Option<AvatarService<S3Client>>,
}

impl Pipeline {
    /// Validate configuration and build all services.
    ///
    /// # Errors
    ///
    /// Returns an error on any misconfiguration. Nothing here touches the
    /// network.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let client = Arc::new(S3Client::from_config(&config.storage)?);
        let target = UploadTarget::from_config(&config.upload, &config.storage.bucket)?;
        let policy = RetryPolicy::from_config(&config.upload);

        info!(
            endpoint = client.endpoint(),
            bucket = target.bucket(),
            cdn_host = target.cdn_host(),
            max_attempts = policy.max_attempts(),
            "storage client configured"
        );

        let uploads = Arc::new(UploadService::new(client, Uploader::new(policy), target));
        let downloader = Downloader::from_config(&config.mirror)?;
        let mirror = Arc::new(RemoteMirror::new(downloader, Arc::clone(&uploads)));
        let avatars = AvatarService::from_config(&config.avatar, Arc::clone(&mirror))
            .map_err(|e| ConfigError::AvatarTemplate(e.to_string()))?;

        Ok(Self {
            uploads,
            mirror,
            avatars,
        })
    }
}
