//! Object storage abstraction
//!
//! A bucket is a flat namespace of `/`-separated object names. Listing is by
//! prefix and recursive. `put` replaces an object in a single call so readers
//! see either the previous or the new content, never a partial write.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::{Error, Result};

/// Content type written for JSON objects
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Top-level folder a bucket keeps for its own bookkeeping; never an object
pub const RESERVED_FOLDER: &str = ".vi-meta";

/// Streaming reader over an object's bytes
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Full object name within the bucket
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
}

impl ObjectInfo {
    /// Last path segment of the object name
    pub fn basename(&self) -> &str {
        basename(&self.name)
    }
}

/// Storage backend for one bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket name, for logging
    fn bucket(&self) -> &str;

    /// All objects whose name starts with `prefix`, in name order
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Open an object for streaming reads; `None` if it does not exist
    async fn open(&self, name: &str) -> Result<Option<ObjectReader>>;

    /// Read a whole object; `None` if it does not exist
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Create or replace an object in one call
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<ObjectInfo>;
}

/// Last `/`-separated segment of an object name
pub fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Split `intro.mp4` into (`intro`, Some(`mp4`)); dotfiles keep their name
pub fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, None),
        Some(idx) => (&file_name[..idx], Some(&file_name[idx + 1..])),
    }
}

/// Reject names that could escape the bucket or alias another object
pub fn validate_object_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("object name must not be empty".to_string()));
    }
    if name.starts_with('/') {
        return Err(Error::InvalidInput(format!("object name {name:?} is absolute")));
    }
    if name.contains('\\') {
        return Err(Error::InvalidInput(format!("object name {name:?} contains a backslash")));
    }
    for segment in name.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::InvalidInput(format!(
                "object name {name:?} has an invalid segment"
            )));
        }
    }
    Ok(())
}
