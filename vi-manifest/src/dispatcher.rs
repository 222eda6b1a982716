//! Upload-triggered dispatch
//!
//! Turns a storage "object finalized" notification into at most one rebuild
//! request for the vehicle the object belongs to.

use serde::{Deserialize, Serialize};
use vi_common::vehicle::UploadPath;
use vi_common::{OrgId, VehicleKey};

use crate::effects::{Effect, LogLevel};

/// Storage notification for a newly written object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFinalized {
    pub bucket: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Body of a message on the rebuild topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildRequest {
    pub org_id: OrgId,
    pub vehicle_key: VehicleKey,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    bucket: String,
    topic: String,
}

impl Dispatcher {
    /// `bucket` is the only bucket whose uploads trigger rebuilds
    pub fn new(bucket: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn handle(&self, event: &ObjectFinalized) -> Vec<Effect> {
        let Some(name) = event.name.as_deref().filter(|n| !n.is_empty()) else {
            return vec![Effect::log(LogLevel::Debug, "upload.skip").reason("no object name")];
        };

        if event.bucket != self.bucket {
            return vec![Effect::log(LogLevel::Debug, "upload.skip")
                .reason("foreign bucket")
                .bucket(&event.bucket)
                .name(name)];
        }

        if name.split('/').count() < 3 {
            return vec![Effect::log(LogLevel::Debug, "upload.skip")
                .reason("path too shallow")
                .name(name)];
        }

        let lowered = name.to_ascii_lowercase();
        if !lowered.contains("/videos/") && !lowered.contains("/captions/") {
            return vec![Effect::log(LogLevel::Debug, "upload.skip")
                .reason("not a media folder")
                .name(name)];
        }

        let upload = match UploadPath::parse(name) {
            Ok(upload) => upload,
            Err(e) => {
                return vec![Effect::log(LogLevel::Warn, "upload.unrecognized_path")
                    .name(name)
                    .error(e)];
            }
        };

        let request = RebuildRequest {
            org_id: upload.org.clone(),
            vehicle_key: upload.vehicle_key(),
        };
        vec![
            Effect::log(LogLevel::Info, "upload.finalize")
                .name(name)
                .org_id(&request.org_id)
                .vehicle_key(&request.vehicle_key)
                .folder(upload.folder.as_str()),
            Effect::Publish {
                topic: self.topic.clone(),
                message: request,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new("vi-media", "ingest-uploaded")
    }

    fn event(name: &str) -> ObjectFinalized {
        ObjectFinalized {
            bucket: "vi-media".to_string(),
            name: Some(name.to_string()),
            content_type: None,
        }
    }

    fn published(effects: &[Effect]) -> Vec<&RebuildRequest> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Publish { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_video_upload_publishes_vehicle() {
        let effects = dispatcher().handle(&event("orgA/honda/crv/2020/ex/videos/intro.mp4"));
        let sent = published(&effects);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].org_id.as_str(), "orgA");
        assert_eq!(sent[0].vehicle_key.as_str(), "honda/crv/2020/ex");

        // Log comes before the publish
        match &effects[0] {
            Effect::Log {
                event: "upload.finalize",
                fields,
                ..
            } => {
                assert_eq!(fields.org_id.as_deref(), Some("orgA"));
                assert_eq!(fields.vehicle_key.as_deref(), Some("honda/crv/2020/ex"));
                assert_eq!(fields.folder.as_deref(), Some("videos"));
            }
            other => panic!("unexpected effect {other:?}"),
        }
        match &effects[1] {
            Effect::Publish { topic, .. } => assert_eq!(topic, "ingest-uploaded"),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_caption_and_thumbnail_uploads_publish() {
        let d = dispatcher();
        assert_eq!(
            published(&d.handle(&event("orgA/honda/crv/2020/ex/captions/intro.vtt"))).len(),
            1
        );
        assert_eq!(
            published(&d.handle(&event("orgA/honda/crv/2020/ex/videos/intro.jpg"))).len(),
            1
        );
        assert_eq!(
            published(&d.handle(&event("orgA/honda/crv/2020/ex/Videos/intro.mp4"))).len(),
            1
        );
    }

    #[test]
    fn test_non_media_paths_skip() {
        let d = dispatcher();
        for name in [
            "orgA/honda/crv/2020/ex/spec-sheet.pdf",
            "orgA/honda",
            "orgA/honda/crv/2020/ex/manifests/videos.json",
        ] {
            assert!(published(&d.handle(&event(name))).is_empty(), "{name}");
        }
    }

    #[test]
    fn test_missing_name_and_foreign_bucket_skip() {
        let d = dispatcher();
        let no_name = ObjectFinalized {
            bucket: "vi-media".to_string(),
            ..Default::default()
        };
        assert!(published(&d.handle(&no_name)).is_empty());

        let mut foreign = event("orgA/honda/crv/2020/ex/videos/intro.mp4");
        foreign.bucket = "someone-else".to_string();
        assert!(published(&d.handle(&foreign)).is_empty());
    }

    #[test]
    fn test_wrong_depth_warns_without_publish() {
        let effects = dispatcher().handle(&event("orgA/honda/crv/videos/intro.mp4"));
        assert!(published(&effects).is_empty());
        assert!(matches!(
            effects.as_slice(),
            [Effect::Log {
                level: LogLevel::Warn,
                event: "upload.unrecognized_path",
                ..
            }]
        ));
    }

    #[test]
    fn test_event_json_shape() {
        let parsed: ObjectFinalized = serde_json::from_str(
            r#"{"bucket":"vi-media","name":"a/b/c","contentType":"video/mp4"}"#,
        )
        .unwrap();
        assert_eq!(parsed.content_type.as_deref(), Some("video/mp4"));

        let bare: ObjectFinalized = serde_json::from_str(r#"{"bucket":"vi-media"}"#).unwrap();
        assert!(bare.name.is_none());
    }
}
