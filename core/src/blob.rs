//! Object-storage collaborator: fetches raw blobs by (bucket, key).
//!
//! RULE: The core only ever reads blobs. It never lists or writes them.

use crate::{
    error::{LiftError, LiftResult},
    event::{parse_event_log, ConversionEvent},
};
use std::{collections::HashMap, path::PathBuf};

pub trait BlobStore {
    fn fetch(&self, bucket: &str, key: &str) -> LiftResult<Vec<u8>>;

    /// Fetch a CSV event log and parse it.
    fn conversions(&self, bucket: &str, key: &str) -> LiftResult<Vec<ConversionEvent>> {
        let raw = self.fetch(bucket, key)?;
        parse_event_log(&raw)
    }
}

/// Blob store backed by a local directory: `<root>/<bucket>/<key>`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for FsBlobStore {
    fn fetch(&self, bucket: &str, key: &str) -> LiftResult<Vec<u8>> {
        let path = self.root.join(bucket).join(key);
        log::debug!("reading blob {}", path.display());
        std::fs::read(&path).map_err(|e| {
            LiftError::Data(format!("Cannot read blob {bucket}/{key}: {e}"))
        })
    }
}

/// In-memory blob store (used in tests).
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<(String, String), Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.blobs
            .insert((bucket.to_string(), key.to_string()), data.into());
    }
}

impl BlobStore for MemoryBlobStore {
    fn fetch(&self, bucket: &str, key: &str) -> LiftResult<Vec<u8>> {
        self.blobs
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| LiftError::Data(format!("Blob {bucket}/{key} not found.")))
    }
}
