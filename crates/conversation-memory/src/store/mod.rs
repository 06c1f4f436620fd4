//! Object store adapter for conversation records
//!
//! Two layers:
//! - `ObjectStore`: path-addressed blob capability (memory, filesystem, HTTP gateway)
//! - `ConversationStore`: typed adapter addressing one JSONL record per `MemoryKey`
//!
//! There is no multi-record transaction support. Writes are full overwrites.

mod fs;
mod http;
mod memory;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::{MemoryError, MemoryResult, TransportError};
use crate::key::MemoryKey;
use crate::record::ConversationRecord;

/// Default blob prefix for conversation records.
pub const DEFAULT_PREFIX: &str = "text/";

/// Metadata returned by an existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    /// `None` when the backend does not report modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Blob store capability.
///
/// Absence is reported as `Ok(None)`; only transport failures are errors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>, TransportError>;

    async fn get(&self, path: &str) -> Result<Option<Bytes>, TransportError>;

    /// Full overwrite.
    async fn put(&self, path: &str, data: Bytes) -> Result<(), TransportError>;

    /// Idempotent: deleting an absent path succeeds.
    async fn delete(&self, path: &str) -> Result<(), TransportError>;
}

/// Typed access to conversation records, one blob per memory key.
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self::with_prefix(backend, DEFAULT_PREFIX)
    }

    pub fn with_prefix(backend: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Blob path for a key, e.g. `text/conversation_294.jsonl`.
    pub fn path_for(&self, key: MemoryKey) -> String {
        format!("{}conversation_{}.jsonl", self.prefix, key)
    }

    pub async fn exists(&self, key: MemoryKey) -> MemoryResult<bool> {
        let meta = self
            .backend
            .head(&self.path_for(key))
            .await
            .map_err(MemoryError::transport)?;
        Ok(meta.is_some())
    }

    pub async fn last_modified(&self, key: MemoryKey) -> MemoryResult<Option<DateTime<Utc>>> {
        let meta = self
            .backend
            .head(&self.path_for(key))
            .await
            .map_err(MemoryError::transport)?;
        Ok(meta.and_then(|m| m.last_modified))
    }

    pub async fn read(&self, key: MemoryKey) -> MemoryResult<ConversationRecord> {
        let path = self.path_for(key);
        let data = self
            .backend
            .get(&path)
            .await
            .map_err(MemoryError::transport)?
            .ok_or(MemoryError::NotFound { key })?;

        let record = ConversationRecord::from_jsonl(key, &data)?;
        debug!("Read {} turns from {}", record.len(), path);
        Ok(record)
    }

    pub async fn write(&self, key: MemoryKey, record: &ConversationRecord) -> MemoryResult<()> {
        let path = self.path_for(key);
        let data = record.to_jsonl()?;
        let size = data.len();

        self.backend
            .put(&path, Bytes::from(data))
            .await
            .map_err(MemoryError::transport)?;

        debug!("Wrote {} turns ({} bytes) to {}", record.len(), size, path);
        Ok(())
    }

    pub async fn delete(&self, key: MemoryKey) -> MemoryResult<()> {
        let path = self.path_for(key);
        self.backend
            .delete(&path)
            .await
            .map_err(MemoryError::transport)?;
        debug!("Deleted {}", path);
        Ok(())
    }
}
