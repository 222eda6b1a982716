//! Manifest rebuild worker
//!
//! Consumes rebuild requests from the bus and rewrites the named vehicle's
//! manifest. Failures are logged and dropped; nothing is retried here.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use vi_common::bus::{BusMessage, Subscription};
use vi_common::storage::{ObjectStore, CONTENT_TYPE_JSON};
use vi_common::{OrgId, VehicleKey};

use crate::effects::{Effect, EffectRunner, LogLevel};
use crate::indexer::list_vehicle_clips;
use crate::manifest::render_manifest;

/// Lenient view of a rebuild message, so bad input is skipped rather than
/// failing to decode
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRebuildRequest {
    #[serde(default)]
    org_id: Option<String>,
    #[serde(default)]
    vehicle_key: Option<String>,
}

#[derive(Clone)]
pub struct RebuildWorker {
    store: Arc<dyn ObjectStore>,
}

impl RebuildWorker {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Effects for one bus message: write then log on success, a log otherwise
    pub async fn handle(&self, message: &BusMessage) -> Vec<Effect> {
        let raw: RawRebuildRequest = message.decode().unwrap_or_default();

        let (org, vehicle) = match (raw.org_id.as_deref(), raw.vehicle_key.as_deref()) {
            (Some(org), Some(vehicle)) if !org.trim().is_empty() && !vehicle.trim().is_empty() => {
                match (OrgId::parse(org), VehicleKey::parse(vehicle)) {
                    (Ok(org), Ok(vehicle)) => (org, vehicle),
                    (Err(e), _) | (_, Err(e)) => {
                        return vec![Effect::log(LogLevel::Warn, "ingest.skip")
                            .message_id(message.message_id)
                            .reason(e)];
                    }
                }
            }
            _ => {
                return vec![Effect::log(LogLevel::Warn, "ingest.skip")
                    .message_id(message.message_id)
                    .reason("missing orgId or vehicleKey")];
            }
        };

        let clips = match list_vehicle_clips(self.store.as_ref(), &org, &vehicle).await {
            Ok(clips) => clips,
            Err(e) => return vec![failure(&org, &vehicle, e)],
        };
        let rendered = match render_manifest(&org, &vehicle, clips, Utc::now()) {
            Ok(rendered) => rendered,
            Err(e) => return vec![failure(&org, &vehicle, e)],
        };

        vec![
            Effect::WriteObject {
                path: rendered.path.clone(),
                bytes: rendered.bytes,
                content_type: CONTENT_TYPE_JSON.to_string(),
            },
            Effect::log(LogLevel::Info, "ingest.manifest.write")
                .org_id(&org)
                .vehicle_key(&vehicle)
                .count(rendered.count)
                .path(rendered.path),
        ]
    }

    /// Process messages until the bus closes
    pub async fn run(self, mut subscription: Subscription, runner: EffectRunner) {
        info!(topic = %subscription.topic(), "Rebuild worker started");
        while let Some(message) = subscription.recv().await {
            let effects = self.handle(&message).await;
            let report = runner.apply(effects).await;
            if let Some(error) = report.failed {
                warn!(message_id = %message.message_id, error = %error, "Rebuild not applied");
            }
        }
        info!(topic = %subscription.topic(), "Rebuild worker stopped");
    }
}

fn failure(org: &OrgId, vehicle: &VehicleKey, error: vi_common::Error) -> Effect {
    Effect::log(LogLevel::Error, "ingest.manifest.error")
        .org_id(org)
        .vehicle_key(vehicle)
        .error(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;
    use vi_common::storage::{MemoryObjectStore, ObjectInfo, ObjectReader};

    /// Store whose listings always fail
    struct UnlistableStore(MemoryObjectStore);

    #[async_trait]
    impl ObjectStore for UnlistableStore {
        fn bucket(&self) -> &str {
            self.0.bucket()
        }

        async fn list(&self, _prefix: &str) -> vi_common::Result<Vec<ObjectInfo>> {
            Err(vi_common::Error::Storage("listing unavailable".to_string()))
        }

        async fn open(&self, name: &str) -> vi_common::Result<Option<ObjectReader>> {
            self.0.open(name).await
        }

        async fn get(&self, name: &str) -> vi_common::Result<Option<Vec<u8>>> {
            self.0.get(name).await
        }

        async fn put(
            &self,
            name: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> vi_common::Result<ObjectInfo> {
            self.0.put(name, bytes, content_type).await
        }
    }

    fn message(data: serde_json::Value) -> BusMessage {
        BusMessage {
            message_id: Uuid::new_v4(),
            topic: "ingest-uploaded".to_string(),
            data,
            publish_time: Utc::now(),
        }
    }

    fn is_skip(effects: &[Effect]) -> bool {
        matches!(
            effects,
            [Effect::Log {
                level: LogLevel::Warn,
                event: "ingest.skip",
                ..
            }]
        )
    }

    #[tokio::test]
    async fn test_missing_fields_skip() {
        let worker = RebuildWorker::new(Arc::new(MemoryObjectStore::new("mem")));
        assert!(is_skip(&worker.handle(&message(json!({}))).await));
        assert!(is_skip(&worker.handle(&message(json!({"orgId": "orgA"}))).await));
        assert!(is_skip(
            &worker
                .handle(&message(json!({"orgId": "", "vehicleKey": "honda/crv/2020/ex"})))
                .await
        ));
        assert!(is_skip(&worker.handle(&message(json!("not an object"))).await));
    }

    #[tokio::test]
    async fn test_rebuild_emits_write_then_log() {
        let store = Arc::new(MemoryObjectStore::new("mem"));
        store
            .put("orgA/honda/crv/2020/ex/videos/intro.mp4", b"v".to_vec(), "video/mp4")
            .await
            .unwrap();
        let worker = RebuildWorker::new(store);

        let effects = worker
            .handle(&message(json!({"orgId": "orgA", "vehicleKey": "honda/crv/2020/ex"})))
            .await;

        assert_eq!(effects.len(), 2);
        match &effects[0] {
            Effect::WriteObject {
                path,
                content_type,
                bytes,
            } => {
                assert_eq!(path, "orgA/honda/crv/2020/ex/manifests/videos.json");
                assert_eq!(content_type, "application/json");
                let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(json["clips"][0]["id"], "intro");
            }
            other => panic!("unexpected effect {other:?}"),
        }
        match &effects[1] {
            Effect::Log {
                event: "ingest.manifest.write",
                fields,
                ..
            } => {
                assert_eq!(fields.org_id.as_deref(), Some("orgA"));
                assert_eq!(fields.count, Some(1));
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listing_failure_logs_error_without_write() {
        let worker = RebuildWorker::new(Arc::new(UnlistableStore(MemoryObjectStore::new("mem"))));

        let effects = worker
            .handle(&message(json!({"orgId": "orgA", "vehicleKey": "honda/crv/2020/ex"})))
            .await;

        match effects.as_slice() {
            [Effect::Log {
                level: LogLevel::Error,
                event: "ingest.manifest.error",
                fields,
            }] => {
                assert_eq!(fields.vehicle_key.as_deref(), Some("honda/crv/2020/ex"));
                assert!(fields.error.as_deref().unwrap().contains("listing unavailable"));
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }
}
