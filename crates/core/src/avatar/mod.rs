//! Per-user avatars mirrored from a generator service.
//!
//! The generator URL is a template; each user gets it with a `seed` query
//! parameter derived from their name. Falling back to the generator URL
//! when mirroring fails is left to the caller.

use std::sync::Arc;

use reqwest::Url;
use rehost_shared::AvatarConfig;

use crate::storage::{DownloadError, MirrorError, ObjectStore, RemoteMirror, UploadResult};

/// Builds seeded generator URLs and mirrors them into the store.
pub struct AvatarService<S> {
    template: Url,
    seed_suffix: String,
    extension: String,
    mirror: Arc<RemoteMirror<S>>,
}

impl<S: ObjectStore> AvatarService<S> {
    /// Create an avatar service.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not an absolute http(s) URL.
    pub fn new(
        template: &str,
        seed_suffix: impl Into<String>,
        extension: impl Into<String>,
        mirror: Arc<RemoteMirror<S>>,
    ) -> Result<Self, DownloadError> {
        let template =
            Url::parse(template).map_err(|e| DownloadError::invalid_url(template, e.to_string()))?;
        if !matches!(template.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(
                template.as_str(),
                "generator must be http(s)",
            ));
        }

        Ok(Self {
            template,
            seed_suffix: seed_suffix.into(),
            extension: extension.into(),
            mirror,
        })
    }

    /// Create the service when the configuration names a generator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured template is not a valid URL.
    pub fn from_config(
        config: &AvatarConfig,
        mirror: Arc<RemoteMirror<S>>,
    ) -> Result<Option<Self>, DownloadError> {
        config
            .generator_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| Self::new(url, &config.seed_suffix, &config.extension, mirror))
            .transpose()
    }

    /// Generator URL for `name`, with the seed appended to any existing query.
    #[must_use]
    pub fn source_url(&self, name: &str) -> String {
        let mut url = self.template.clone();
        url.query_pairs_mut()
            .append_pair("seed", &format!("{name}{}", self.seed_suffix));
        url.into()
    }

    /// Mirror the avatar for `name` into the store.
    ///
    /// # Errors
    ///
    /// Returns the mirror failure unchanged.
    pub async fn provision(&self, name: &str) -> Result<UploadResult, MirrorError> {
        self.mirror
            .mirror(&self.source_url(name), &self.extension)
            .await
    }
}
