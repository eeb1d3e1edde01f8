//! Upload pipeline for S3-compatible object storage using Apache OpenDAL.
//!
//! Two paths share the same tail:
//!
//! ```text
//! direct:  UploadRequest ─┐
//!                         ├─> StorageKey::generate ─> Uploader::put ─> public_url
//! mirror:  Downloader ────┘        (once per upload)    (bounded retry)
//! ```
//!
//! The key is generated once and reused by every retry, so a retry
//! overwrites the same object instead of creating a new one.

mod client;
mod error;
mod key;
mod mirror;
mod retry;
mod service;
mod uploader;
mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientConfig, ObjectStore, S3Client};
pub use error::{ConfigError, DownloadError, MirrorError, StoreError, UploadError};
pub use key::{KeyPrefix, RANDOM_BYTES, StorageKey};
pub use mirror::{Downloader, RemoteMirror, RemoteObject};
pub use retry::{Backoff, RetryPolicy};
pub use service::{UploadRequest, UploadResult, UploadService, UploadTarget};
pub use uploader::Uploader;
pub use url::public_url;
