//! Dataset Labeling
//!
//! Bulk import of confirmed transcriptions from an images folder and a
//! parallel labels folder (`scan01.jpg` is labeled by `scan01.txt`).

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{LabelCache, LabelError};

/// Image extensions picked up from the images folder
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Outcome of a dataset import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrainingSummary {
    /// Images recorded with a label
    pub labeled: usize,
    /// Images without a matching label file
    pub skipped: usize,
    pub epochs: u32,
}

/// Record every labeled image of a dataset into the cache.
///
/// Keys are `images_dir` joined with the image file name, as a string.
/// Label text is trimmed. All entries are persisted once at the end; when
/// nothing was labeled (including `epochs == 0`) the store is not written.
/// Each epoch repeats the scan; later scans overwrite earlier ones.
pub fn train_from_dataset(
    cache: &LabelCache,
    images_dir: &Path,
    labels_dir: &Path,
    epochs: u32,
) -> Result<TrainingSummary, LabelError> {
    let mut summary = TrainingSummary {
        epochs,
        ..Default::default()
    };
    let mut batch: Vec<(String, String)> = Vec::new();

    for epoch in 1..=epochs {
        tracing::info!(epoch, epochs, images_dir = %images_dir.display(), "Scanning dataset");

        let images = list_images(images_dir)?;
        let (mut labeled, mut skipped) = (0, 0);

        for image_path in images {
            let Some(stem) = image_path.file_stem() else {
                continue;
            };
            let mut label_name = stem.to_os_string();
            label_name.push(".txt");
            let label_path = labels_dir.join(label_name);

            if !label_path.is_file() {
                tracing::debug!(image = %image_path.display(), "No label file, skipping");
                skipped += 1;
                continue;
            }

            let text = std::fs::read_to_string(&label_path)
                .map_err(|e| LabelError::io(&label_path, e))?;
            batch.push((image_path.display().to_string(), text.trim().to_string()));
            labeled += 1;
        }

        summary.labeled = labeled;
        summary.skipped = skipped;
    }

    if batch.is_empty() {
        tracing::info!(skipped = summary.skipped, "No labeled images, store left untouched");
        return Ok(summary);
    }
    cache.record_many(batch)?;

    tracing::info!(
        labeled = summary.labeled,
        skipped = summary.skipped,
        "Dataset labeling complete"
    );
    Ok(summary)
}

/// Image files in `dir`, sorted by name
fn list_images(dir: &Path) -> Result<Vec<PathBuf>, LabelError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LabelError::io(dir, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LabelError::io(dir, e))?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if is_image && path.is_file() {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}
