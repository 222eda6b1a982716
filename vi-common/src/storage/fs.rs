//! Filesystem-backed bucket
//!
//! Object `a/b/c.mp4` lives at `{root}/a/b/c.mp4`. Content types are kept in
//! sidecar files under `{root}/.vi-meta/`, which never shows up in listings.
//! Writes go to a temp file under the same hidden folder and are renamed
//! into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

use super::{validate_object_name, ObjectInfo, ObjectReader, ObjectStore};
use super::RESERVED_FOLDER as META_DIR;
use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    content_type: String,
}

/// Bucket stored as a directory tree
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    bucket: String,
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(bucket: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            root: root.into(),
        }
    }

    fn object_path(&self, name: &str) -> Result<PathBuf> {
        validate_object_name(name)?;
        if name == META_DIR || name.starts_with(&format!("{META_DIR}/")) {
            return Err(Error::InvalidInput(format!("object name {name:?} is reserved")));
        }
        Ok(self.root.join(name))
    }

    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.root.join(META_DIR).join("objects").join(format!("{name}.json"))
    }

    fn temp_path(&self) -> PathBuf {
        self.root
            .join(META_DIR)
            .join("tmp")
            .join(format!("{}.part", Uuid::new_v4()))
    }

    async fn write_replace(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = self.temp_path();
        if let Some(parent) = tmp.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_content_type(&self, name: &str) -> Option<String> {
        let bytes = tokio::fs::read(self.sidecar_path(name)).await.ok()?;
        serde_json::from_slice::<Sidecar>(&bytes)
            .ok()
            .map(|s| s.content_type)
    }
}

/// Directory to walk for a prefix: everything up to the last `/`
fn walk_base(prefix: &str) -> Result<&str> {
    let dir = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    if !dir.is_empty() {
        validate_object_name(dir)?;
    }
    Ok(dir)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let base = walk_base(prefix)?;
        let start = if base.is_empty() {
            self.root.clone()
        } else {
            self.root.join(base)
        };

        let root = self.root.clone();
        let prefix_owned = prefix.to_string();
        let found = tokio::task::spawn_blocking(move || -> Result<Vec<(String, u64)>> {
            if !start.is_dir() {
                return Ok(Vec::new());
            }

            let mut found = Vec::new();
            let walker = WalkDir::new(&start)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    !(e.depth() > 0 && e.path().parent() == Some(root.as_path())
                        && e.file_name() == META_DIR)
                });

            for entry in walker {
                let entry = entry.map_err(|e| Error::Storage(format!("list failed: {e}")))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(name) = relative_name(&root, entry.path()) else {
                    continue;
                };
                if !name.starts_with(&prefix_owned) {
                    continue;
                }
                let size = entry
                    .metadata()
                    .map_err(|e| Error::Storage(format!("stat {name} failed: {e}")))?
                    .len();
                found.push((name, size));
            }
            Ok(found)
        })
        .await
        .map_err(|e| Error::Internal(format!("List task failed: {e}")))??;

        let mut objects = Vec::with_capacity(found.len());
        for (name, size) in found {
            let content_type = self.read_content_type(&name).await;
            objects.push(ObjectInfo {
                name,
                size,
                content_type,
            });
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(bucket = %self.bucket, prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn open(&self, name: &str) -> Result<Option<ObjectReader>> {
        let path = self.object_path(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let file = tokio::fs::File::open(&path).await?;
        Ok(Some(Box::pin(file)))
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<ObjectInfo> {
        let path = self.object_path(name)?;
        let size = bytes.len() as u64;
        self.write_replace(&path, &bytes).await?;

        let sidecar = serde_json::to_vec(&Sidecar {
            content_type: content_type.to_string(),
        })?;
        self.write_replace(&self.sidecar_path(name), &sidecar).await?;

        debug!(bucket = %self.bucket, name, size, content_type, "Wrote object");
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
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn store() -> (TempDir, FsObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new("test-bucket", dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_then_get_and_list() {
        let (_dir, store) = store();
        store
            .put("orgA/honda/videos/b.mp4", b"bbb".to_vec(), "video/mp4")
            .await
            .unwrap();
        store
            .put("orgA/honda/videos/a.mp4", b"a".to_vec(), "video/mp4")
            .await
            .unwrap();
        store
            .put("orgA/honda/captions/a.vtt", b"WEBVTT".to_vec(), "text/vtt")
            .await
            .unwrap();

        let listed = store.list("orgA/honda/videos/").await.unwrap();
        let names: Vec<_> = listed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["orgA/honda/videos/a.mp4", "orgA/honda/videos/b.mp4"]);
        assert_eq!(listed[1].size, 3);
        assert_eq!(listed[0].content_type.as_deref(), Some("video/mp4"));

        let bytes = store.get("orgA/honda/captions/a.vtt").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"WEBVTT"[..]));
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let (_dir, store) = store();
        assert!(store.list("nobody/here/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_hides_metadata_folder() {
        let (_dir, store) = store();
        store.put("a.json", b"{}".to_vec(), "application/json").await.unwrap();
        let listed = store.list("").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a.json");
    }

    #[tokio::test]
    async fn test_list_partial_prefix() {
        let (_dir, store) = store();
        store.put("org/videos/intro.mp4", vec![1], "video/mp4").await.unwrap();
        store.put("org/videos/outro.mp4", vec![1], "video/mp4").await.unwrap();
        let listed = store.list("org/videos/in").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].basename(), "intro.mp4");
    }

    #[tokio::test]
    async fn test_put_replaces_content() {
        let (_dir, store) = store();
        store.put("m/videos.json", b"old".to_vec(), "application/json").await.unwrap();
        store.put("m/videos.json", b"new!".to_vec(), "application/json").await.unwrap();
        assert_eq!(store.get("m/videos.json").await.unwrap().unwrap(), b"new!");
        assert_eq!(store.list("m/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_streams_and_missing_is_none() {
        let (_dir, store) = store();
        store.put("x/clip.mp4", b"stream me".to_vec(), "video/mp4").await.unwrap();

        let mut reader = store.open("x/clip.mp4").await.unwrap().unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"stream me");

        assert!(store.open("x/none.mp4").await.unwrap().is_none());
        assert!(store.open("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let (_dir, store) = store();
        assert!(store.put("../evil", vec![], "text/plain").await.is_err());
        assert!(store.put(".vi-meta/objects/x", vec![], "text/plain").await.is_err());
        assert!(store.list("../").await.is_err());
    }
}
