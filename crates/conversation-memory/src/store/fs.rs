use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::debug;

use super::{ObjectMeta, ObjectStore};
use crate::error::TransportError;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Blob store rooted at a local directory.
///
/// Writes land in a sibling temp file and are renamed into place, so a
/// reader never observes a half-written record.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, TransportError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if !safe || path.is_empty() {
            return Err(TransportError::Other(format!("Invalid object path: {}", path)));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>, TransportError> {
        let file = self.resolve(path)?;
        match fs::metadata(&file).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, TransportError> {
        let file = self.resolve(path)?;
        match fs::read(&file).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), TransportError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = file.with_extension(format!("tmp-{}-{}", std::process::id(), seq));

        fs::write(&tmp, &data).await?;
        if let Err(e) = fs::rename(&tmp, &file).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Stored {} bytes at {:?}", data.len(), file);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let file = self.resolve(path)?;
        match fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_head_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let path = "text/conversation_1.jsonl";

        assert!(store.head(path).await.unwrap().is_none());
        assert!(store.get(path).await.unwrap().is_none());

        store.put(path, Bytes::from_static(b"{}\n")).await.unwrap();

        let meta = store.head(path).await.unwrap().unwrap();
        assert!(meta.last_modified.is_some());
        assert_eq!(store.get(path).await.unwrap().unwrap(), Bytes::from_static(b"{}\n"));
        assert!(dir.path().join("text").join("conversation_1.jsonl").exists());

        store.delete(path).await.unwrap();
        store.delete(path).await.unwrap();
        assert!(store.head(path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let path = "text/conversation_2.jsonl";

        store.put(path, Bytes::from_static(b"one\n")).await.unwrap();
        store.put(path, Bytes::from_static(b"two\n")).await.unwrap();

        assert_eq!(store.get(path).await.unwrap().unwrap(), Bytes::from_static(b"two\n"));
        let entries = std::fs::read_dir(dir.path().join("text")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.put("/abs", Bytes::new()).await.is_err());
        assert!(store.head("").await.is_err());
    }
}
