//! In-memory bucket, used by tests and local dry runs

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{validate_object_name, ObjectInfo, ObjectReader, ObjectStore};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Arc<Vec<u8>>,
    content_type: String,
}

/// Bucket held in a sorted map
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Content type recorded by the last `put` of `name`
    pub fn content_type(&self, name: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(name)
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, name: &str) -> Result<Option<StoredObject>> {
        validate_object_name(name)?;
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::Internal("object map lock poisoned".to_string()))?;
        Ok(objects.get(name).cloned())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::Internal("object map lock poisoned".to_string()))?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, obj)| ObjectInfo {
                name: name.clone(),
                size: obj.bytes.len() as u64,
                content_type: Some(obj.content_type.clone()),
            })
            .collect())
    }

    async fn open(&self, name: &str) -> Result<Option<ObjectReader>> {
        Ok(self.lookup(name)?.map(|obj| {
            let reader: ObjectReader = Box::pin(Cursor::new(obj.bytes.as_ref().clone()));
            reader
        }))
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lookup(name)?.map(|obj| obj.bytes.as_ref().clone()))
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<ObjectInfo> {
        validate_object_name(name)?;
        let size = bytes.len() as u64;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| Error::Internal("object map lock poisoned".to_string()))?;
        objects.insert(
            name.to_string(),
            StoredObject {
                bytes: Arc::new(bytes),
                content_type: content_type.to_string(),
            },
        );
        Ok(ObjectInfo {
            name: name.to_string(),
            size,
            content_type: Some(content_type.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_listing_is_sorted_and_bounded() {
        let store = MemoryObjectStore::new("mem");
        store.put("o/v/videos/b.mp4", vec![1, 2], "video/mp4").await.unwrap();
        store.put("o/v/videos/a.mp4", vec![1], "video/mp4").await.unwrap();
        store.put("o/v/videosX/c.mp4", vec![1], "video/mp4").await.unwrap();
        store.put("o/w/videos/d.mp4", vec![1], "video/mp4").await.unwrap();

        let listed = store.list("o/v/videos/").await.unwrap();
        let names: Vec<_> = listed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["o/v/videos/a.mp4", "o/v/videos/b.mp4"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_records_content_type() {
        let store = MemoryObjectStore::new("mem");
        store.put("m.json", b"{}".to_vec(), "application/json").await.unwrap();
        assert_eq!(store.content_type("m.json").as_deref(), Some("application/json"));
        assert_eq!(store.len(), 1);
        assert!(store.get("missing.json").await.unwrap().is_none());
    }
}
