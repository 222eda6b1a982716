//! Vehicle video manifest
//!
//! `{org}/{vehicleKey}/manifests/videos.json` indexes a vehicle's clips. It
//! is rewritten wholesale on every rebuild; there is no incremental update
//! and no history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vi_common::storage::{ObjectStore, CONTENT_TYPE_JSON};
use vi_common::vehicle::vehicle_root;
use vi_common::{OrgId, Result, VehicleKey};

use crate::checksum::Digest;
use crate::indexer::list_vehicle_clips;

pub const MANIFEST_VERSION: u32 = 1;

/// One video with its optional caption and thumbnail
///
/// Paths are relative to the vehicle folder (`videos/intro.mp4`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    /// Display label derived from `id`
    pub title: String,
    pub src: String,
    pub thumb: Option<String>,
    pub caption: Option<String>,
    pub checksum: Option<Digest>,
}

impl Clip {
    pub fn title_for(id: &str) -> String {
        id.replace(['-', '_'], " ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleManifest {
    pub version: u32,
    pub org_id: OrgId,
    pub vehicle_key: VehicleKey,
    /// Milliseconds since the Unix epoch on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// Sorted by `id`
    pub clips: Vec<Clip>,
}

/// What a manifest write produced, for logs and HTTP responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestWriteOutcome {
    pub count: usize,
    pub path: String,
}

/// Serialized manifest, ready to be stored in one write
#[derive(Debug, Clone)]
pub struct RenderedManifest {
    pub path: String,
    pub bytes: Vec<u8>,
    pub count: usize,
}

pub fn manifest_path(org: &OrgId, vehicle: &VehicleKey) -> String {
    format!("{}/manifests/videos.json", vehicle_root(org, vehicle))
}

pub fn render_manifest(
    org: &OrgId,
    vehicle: &VehicleKey,
    clips: Vec<Clip>,
    now: DateTime<Utc>,
) -> Result<RenderedManifest> {
    let count = clips.len();
    let manifest = VehicleManifest {
        version: MANIFEST_VERSION,
        org_id: org.clone(),
        vehicle_key: vehicle.clone(),
        updated_at: now,
        clips,
    };
    Ok(RenderedManifest {
        path: manifest_path(org, vehicle),
        bytes: serde_json::to_vec_pretty(&manifest)?,
        count,
    })
}

/// Serialize and store the manifest, replacing any previous one
pub async fn write_manifest(
    store: &dyn ObjectStore,
    org: &OrgId,
    vehicle: &VehicleKey,
    clips: Vec<Clip>,
    now: DateTime<Utc>,
) -> Result<ManifestWriteOutcome> {
    let rendered = render_manifest(org, vehicle, clips, now)?;
    store
        .put(&rendered.path, rendered.bytes, CONTENT_TYPE_JSON)
        .await?;
    debug!(path = %rendered.path, count = rendered.count, "Manifest stored");
    Ok(ManifestWriteOutcome {
        count: rendered.count,
        path: rendered.path,
    })
}

/// Re-index the vehicle's media folders and rewrite its manifest
pub async fn rebuild_manifest(
    store: &dyn ObjectStore,
    org: &OrgId,
    vehicle: &VehicleKey,
) -> Result<ManifestWriteOutcome> {
    let clips = list_vehicle_clips(store, org, vehicle).await?;
    write_manifest(store, org, vehicle, clips, Utc::now()).await
}

/// Stored manifest, if one was ever written
pub async fn read_manifest(
    store: &dyn ObjectStore,
    org: &OrgId,
    vehicle: &VehicleKey,
) -> Result<Option<VehicleManifest>> {
    match store.get(&manifest_path(org, vehicle)).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;
    use vi_common::storage::MemoryObjectStore;

    fn ids() -> (OrgId, VehicleKey) {
        (
            OrgId::parse("orgA").unwrap(),
            VehicleKey::parse("honda/crv/2020/ex").unwrap(),
        )
    }

    fn clip(id: &str) -> Clip {
        Clip {
            id: id.to_string(),
            title: Clip::title_for(id),
            src: format!("videos/{id}.mp4"),
            thumb: None,
            caption: Some(format!("captions/{id}.vtt")),
            checksum: Some(Digest::sha256_of(id.as_bytes())),
        }
    }

    #[test]
    fn test_title_replaces_separators() {
        assert_eq!(Clip::title_for("pair-phone_bluetooth"), "pair phone bluetooth");
    }

    #[test]
    fn test_manifest_path() {
        let (org, vehicle) = ids();
        assert_eq!(
            manifest_path(&org, &vehicle),
            "orgA/honda/crv/2020/ex/manifests/videos.json"
        );
    }

    #[test]
    fn test_rendered_json_shape() {
        let (org, vehicle) = ids();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let rendered = render_manifest(&org, &vehicle, vec![clip("intro")], now).unwrap();

        let text = String::from_utf8(rendered.bytes).unwrap();
        assert!(text.contains('\n'), "manifest should be pretty-printed");

        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["orgId"], "orgA");
        assert_eq!(json["vehicleKey"], "honda/crv/2020/ex");
        assert_eq!(json["updatedAt"], 1_700_000_000_123i64);
        assert_eq!(json["clips"][0]["id"], "intro");
        assert_eq!(json["clips"][0]["thumb"], Value::Null);
        assert_eq!(json["clips"][0]["caption"], "captions/intro.vtt");
        assert!(json["clips"][0]["checksum"]
            .as_str()
            .unwrap()
            .starts_with("sha256:"));
    }

    #[tokio::test]
    async fn test_write_overwrites_with_json_content_type() {
        let (org, vehicle) = ids();
        let store = MemoryObjectStore::new("mem");

        write_manifest(&store, &org, &vehicle, vec![clip("a"), clip("b")], Utc::now())
            .await
            .unwrap();
        let outcome = write_manifest(&store, &org, &vehicle, vec![clip("c")], Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.path, manifest_path(&org, &vehicle));
        assert_eq!(
            store.content_type(&outcome.path).as_deref(),
            Some("application/json")
        );

        let stored = read_manifest(&store, &org, &vehicle).await.unwrap().unwrap();
        assert_eq!(stored.clips, vec![clip("c")]);
    }

    #[tokio::test]
    async fn test_read_missing_manifest() {
        let (org, vehicle) = ids();
        let store = MemoryObjectStore::new("mem");
        assert!(read_manifest(&store, &org, &vehicle).await.unwrap().is_none());
    }
}
