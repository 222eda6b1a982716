//! Clip indexer
//!
//! Pairs each `.mp4` under a vehicle's `videos/` folder with the caption and
//! thumbnail that share its base name.

use std::collections::HashMap;

use tracing::debug;
use vi_common::storage::{split_extension, ObjectInfo, ObjectStore};
use vi_common::vehicle::{vehicle_root, MediaFolder};
use vi_common::{OrgId, Result, VehicleKey};

use crate::checksum::compute_checksum;
use crate::manifest::Clip;

const VIDEO_EXTENSION: &str = "mp4";
const THUMB_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Build the clip list for one vehicle, sorted by id
///
/// Listing errors propagate. A clip whose checksum cannot be computed is
/// still emitted, with no checksum.
pub async fn list_vehicle_clips(
    store: &dyn ObjectStore,
    org: &OrgId,
    vehicle: &VehicleKey,
) -> Result<Vec<Clip>> {
    let base = vehicle_root(org, vehicle);
    let videos_prefix = format!("{base}/{}/", MediaFolder::Videos.as_str());
    let captions_prefix = format!("{base}/{}/", MediaFolder::Captions.as_str());

    let videos = store.list(&videos_prefix).await?;
    let captions = store.list(&captions_prefix).await?;
    debug!(
        base = %base,
        videos = videos.len(),
        captions = captions.len(),
        "Listed vehicle media"
    );

    let caption_by_stem = stem_map(&base, captions.iter());
    let thumb_by_stem = stem_map(
        &base,
        videos.iter().filter(|o| has_extension(o, &THUMB_EXTENSIONS)),
    );

    let mut clips = Vec::new();
    for object in videos.iter().filter(|o| has_extension(o, &[VIDEO_EXTENSION])) {
        let (id, _) = split_extension(object.basename());
        clips.push(Clip {
            id: id.to_string(),
            title: Clip::title_for(id),
            src: relative_to(&base, &object.name),
            thumb: thumb_by_stem.get(id).cloned(),
            caption: caption_by_stem.get(id).cloned(),
            checksum: compute_checksum(store, &object.name).await,
        });
    }

    clips.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(clips)
}

/// Base name without extension -> path relative to the vehicle root
///
/// Later entries win when two objects share a stem.
fn stem_map<'a>(
    base: &str,
    objects: impl Iterator<Item = &'a ObjectInfo>,
) -> HashMap<String, String> {
    objects
        .map(|o| {
            let (stem, _) = split_extension(o.basename());
            (stem.to_string(), relative_to(base, &o.name))
        })
        .collect()
}

fn has_extension(object: &ObjectInfo, wanted: &[&str]) -> bool {
    match split_extension(object.basename()) {
        (_, Some(ext)) => wanted.iter().any(|w| ext.eq_ignore_ascii_case(w)),
        _ => false,
    }
}

fn relative_to(base: &str, name: &str) -> String {
    name.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
        .to_string()
}
