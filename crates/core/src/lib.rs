//! Object-storage upload pipeline for rehost.
//!
//! Pushes bytes to an S3-compatible store under collision-resistant keys,
//! retries failed writes, and re-hosts remote resources.
//!
//! # Modules
//!
//! - `storage` - Key generation, S3 client, retrying uploader, remote mirror
//! - `avatar` - Seeded avatar generator URLs mirrored into the store
//! - `pipeline` - Startup wiring from configuration

pub mod avatar;
pub mod pipeline;
pub mod storage;

pub use pipeline::Pipeline;
