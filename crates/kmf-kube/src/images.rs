//! Pointing workload containers at mirrored images

use kmf_core::Kind;
use kmf_repo::ImageMirror;
use kube::api::DynamicObject;

use crate::error::Result;
use crate::inventory::ResourceInventory;
use crate::kinds::display_name;

/// Where the container list sits inside each rewritten kind
const CONTAINER_PATHS: &[(Kind, &str)] = &[
    (Kind::Deployment, "/spec/template/spec/containers"),
    (Kind::CronJob, "/spec/jobTemplate/spec/template/spec/containers"),
];

/// Rewrite Deployment and CronJob container images through `mirror`
///
/// Returns how many container references changed. A mirroring failure
/// aborts the pass.
pub async fn rewrite_images(inventory: &mut ResourceInventory, mirror: &ImageMirror) -> Result<usize> {
    let mut changed = 0;
    for (kind, pointer) in CONTAINER_PATHS {
        for obj in inventory.objects_mut(*kind) {
            changed += rewrite_object(*kind, obj, pointer, mirror).await?;
        }
    }
    tracing::info!(changed, "rewrote container images");
    Ok(changed)
}

async fn rewrite_object(
    kind: Kind,
    obj: &mut DynamicObject,
    pointer: &str,
    mirror: &ImageMirror,
) -> Result<usize> {
    let label = display_name(kind, obj);
    let Some(containers) = obj.data.pointer_mut(pointer).and_then(|c| c.as_array_mut()) else {
        return Ok(0);
    };

    let mut changed = 0;
    for container in containers {
        let Some(image) = container.get("image").and_then(|i| i.as_str()).map(str::to_string) else {
            continue;
        };
        let rewritten = mirror.rewrite(&image).await?;
        if rewritten != image {
            tracing::debug!(object = %label, from = %image, to = %rewritten, "rewrote image");
            container["image"] = serde_json::Value::String(rewritten);
            changed += 1;
        }
    }
    Ok(changed)
}
