use crate::result::RetrievedItem;
use chunkit_indexer::{ImageAsset, ImageAssetMap};
use chunkit_vector_store::{split_image_tag, ChunkOrigin, ChunkRecord};
use std::path::{Path, PathBuf};

/// Prefix of the `source` field when an image file cannot be located
pub const IMAGE_NOT_FOUND: &str = "image path not found";

/// Turn a stored chunk into a typed result.
///
/// Image chunks get their caption with the `image_<n>:` tag removed and the
/// image file location as `source`.
#[must_use]
pub fn classify(record: &ChunkRecord, assets: &ImageAssetMap, asset_root: &Path) -> RetrievedItem {
    if record.origin() != ChunkOrigin::ImageDescription {
        return RetrievedItem::text(record.content.clone());
    }

    let (image_id, caption) = match split_image_tag(&record.content) {
        Some((tag, caption)) => (tag.to_string(), caption.to_string()),
        None => {
            let id = record
                .metadata
                .get("image_id")
                .and_then(|value| value.as_str())
                .unwrap_or(&record.id)
                .to_string();
            (id, record.content.trim().to_string())
        }
    };

    let source = match assets.get(&image_id) {
        Some(asset) => resolve_image_path(asset, asset_root),
        None => {
            log::warn!("No image asset recorded for {image_id}");
            format!("{IMAGE_NOT_FOUND}: {image_id}")
        }
    };
    RetrievedItem::image(caption, source)
}

/// Stored path, then the processed copy, then either one resolved against
/// `asset_root`. Falls back to a not-found message.
#[must_use]
pub fn resolve_image_path(asset: &ImageAsset, asset_root: &Path) -> String {
    let candidates: Vec<String> = [&asset.image_path, &asset.processed_path]
        .into_iter()
        .map(|raw| raw.replace('\\', "/"))
        .filter(|raw| !raw.is_empty())
        .collect();

    for candidate in &candidates {
        if Path::new(candidate).exists() {
            return candidate.clone();
        }
    }

    for candidate in &candidates {
        let path = Path::new(candidate);
        if path.is_absolute() {
            continue;
        }
        let absolute: PathBuf = asset_root.join(path);
        if absolute.exists() {
            return absolute.to_string_lossy().into_owned();
        }
    }

    let shown = candidates.first().map(String::as_str).unwrap_or_default();
    format!("{IMAGE_NOT_FOUND}: {shown}")
}
