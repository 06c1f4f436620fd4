use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{ObjectMeta, ObjectStore};
use crate::error::TransportError;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// In-process blob store backed by a `HashMap<path, bytes>`.
///
/// Contents are lost on restart; meant for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the modification time of a stored object. Returns false if
    /// the path is absent.
    pub fn set_last_modified(&self, path: &str, at: DateTime<Utc>) -> bool {
        match self.objects.lock().get_mut(path) {
            Some(obj) => {
                obj.last_modified = at;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>, TransportError> {
        Ok(self.objects.lock().get(path).map(|obj| ObjectMeta {
            last_modified: Some(obj.last_modified),
        }))
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, TransportError> {
        Ok(self.objects.lock().get(path).map(|obj| obj.data.clone()))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), TransportError> {
        self.objects.lock().insert(
            path.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.objects.lock().remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_set_last_modified() {
        let store = MemoryObjectStore::new();
        store.put("a", Bytes::from_static(b"x")).await.unwrap();

        let past = Utc::now() - Duration::hours(5);
        assert!(store.set_last_modified("a", past));
        assert!(!store.set_last_modified("missing", past));

        let meta = store.head("a").await.unwrap().unwrap();
        assert_eq!(meta.last_modified, Some(past));
    }
}
