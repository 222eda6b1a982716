//! Manifest rebuild behavior over whole vehicle folders

use async_trait::async_trait;
use vi_common::storage::{MemoryObjectStore, ObjectInfo, ObjectReader, ObjectStore};
use vi_common::{Error, OrgId, Result, VehicleKey};
use vi_manifest::manifest::{read_manifest, rebuild_manifest};

/// Memory store whose reads or listings can be made to fail
struct FlakyStore {
    inner: MemoryObjectStore,
    fail_open_containing: Option<&'static str>,
    fail_list: bool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryObjectStore::new("flaky"),
            fail_open_containing: None,
            fail_list: false,
        }
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        if self.fail_list {
            return Err(Error::Storage("listing unavailable".to_string()));
        }
        self.inner.list(prefix).await
    }

    async fn open(&self, name: &str) -> Result<Option<ObjectReader>> {
        if let Some(marker) = self.fail_open_containing {
            if name.contains(marker) {
                return Err(Error::Storage(format!("cannot read {name}")));
            }
        }
        self.inner.open(name).await
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(name).await
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<ObjectInfo> {
        self.inner.put(name, bytes, content_type).await
    }
}

fn ids() -> (OrgId, VehicleKey) {
    (
        OrgId::parse("orgA").unwrap(),
        VehicleKey::parse("toyota/camry/2025/le").unwrap(),
    )
}

async fn seed(store: &dyn ObjectStore, names: &[String]) {
    for name in names {
        store
            .put(name, name.clone().into_bytes(), "application/octet-stream")
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_matched_and_unmatched_clips() {
    let store = FlakyStore::new();
    let (org, vehicle) = ids();
    let base = "orgA/toyota/camry/2025/le";

    let matched = 3;
    let unmatched = 4;
    let mut names = Vec::new();
    for i in 0..matched {
        names.push(format!("{base}/videos/m{i}.mp4"));
        names.push(format!("{base}/captions/m{i}.vtt"));
    }
    for i in 0..unmatched {
        names.push(format!("{base}/videos/u{i}.mp4"));
    }
    // Caption without a video contributes nothing
    names.push(format!("{base}/captions/orphan.vtt"));
    seed(&store, &names).await;

    let outcome = rebuild_manifest(&store, &org, &vehicle).await.unwrap();
    assert_eq!(outcome.count, matched + unmatched);

    let manifest = read_manifest(&store, &org, &vehicle).await.unwrap().unwrap();
    let with_caption = manifest.clips.iter().filter(|c| c.caption.is_some()).count();
    assert_eq!(with_caption, matched);
    assert!(manifest.clips.iter().all(|c| c.id != "orphan"));
}

#[tokio::test]
async fn test_rebuild_is_idempotent_apart_from_timestamp() {
    let store = FlakyStore::new();
    let (org, vehicle) = ids();
    seed(
        &store,
        &[
            "orgA/toyota/camry/2025/le/videos/b.mp4".to_string(),
            "orgA/toyota/camry/2025/le/videos/a.mp4".to_string(),
            "orgA/toyota/camry/2025/le/videos/a.png".to_string(),
        ],
    )
    .await;

    rebuild_manifest(&store, &org, &vehicle).await.unwrap();
    let first = read_manifest(&store, &org, &vehicle).await.unwrap().unwrap();
    rebuild_manifest(&store, &org, &vehicle).await.unwrap();
    let second = read_manifest(&store, &org, &vehicle).await.unwrap().unwrap();

    assert_eq!(first.clips, second.clips);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_thumbnail_never_becomes_a_clip() {
    let store = FlakyStore::new();
    let (org, vehicle) = ids();
    seed(
        &store,
        &[
            "orgA/toyota/camry/2025/le/videos/cover.jpg".to_string(),
            "orgA/toyota/camry/2025/le/videos/cover.PNG".to_string(),
        ],
    )
    .await;

    let outcome = rebuild_manifest(&store, &org, &vehicle).await.unwrap();
    assert_eq!(outcome.count, 0);
    let manifest = read_manifest(&store, &org, &vehicle).await.unwrap().unwrap();
    assert!(manifest.clips.is_empty());
}

#[tokio::test]
async fn test_checksum_failure_keeps_clip() {
    let mut store = FlakyStore::new();
    store.fail_open_containing = Some("broken");
    let (org, vehicle) = ids();
    seed(
        &store,
        &[
            "orgA/toyota/camry/2025/le/videos/broken.mp4".to_string(),
            "orgA/toyota/camry/2025/le/videos/fine.mp4".to_string(),
        ],
    )
    .await;

    let outcome = rebuild_manifest(&store, &org, &vehicle).await.unwrap();
    assert_eq!(outcome.count, 2);

    let manifest = read_manifest(&store, &org, &vehicle).await.unwrap().unwrap();
    assert!(manifest.clips[0].checksum.is_none());
    assert!(manifest.clips[1].checksum.is_some());

    let raw = store.get(&outcome.path).await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert!(json["clips"][0]["checksum"].is_null());
}

#[tokio::test]
async fn test_listing_failure_propagates_and_writes_nothing() {
    let mut store = FlakyStore::new();
    store.fail_list = true;
    let (org, vehicle) = ids();

    assert!(rebuild_manifest(&store, &org, &vehicle).await.is_err());
    assert!(store.inner.is_empty());
}
