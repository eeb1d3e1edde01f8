//! Shared configuration for rehost.
//!
//! Configuration is loaded once at process startup and handed to the
//! pipeline as an immutable value.

pub mod config;

pub use config::{AppConfig, AvatarConfig, MirrorConfig, StorageConfig, UploadConfig};
