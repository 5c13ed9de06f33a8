//! Label Cache
//!
//! Persisted map from an image key to a confirmed transcription. A hit
//! is treated as ground truth and skips OCR and correction entirely.
//!
//! The key is the image path string exactly as given when the image was
//! processed or labeled. Paths are not normalized, so the same file
//! reached through a different path is a different key.
//!
//! The store is a JSON object of string keys to string values. Each
//! mutation rewrites the whole map to a temporary sibling file which is
//! then renamed into place.

mod training;

pub use training::{train_from_dataset, TrainingSummary};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

/// Label cache errors
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Label store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize label store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LabelError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Shared, persisted label cache
///
/// Cloning is cheap; clones share the same map and store.
#[derive(Clone)]
pub struct LabelCache {
    inner: Arc<LabelCacheInner>,
}

struct LabelCacheInner {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
    /// Serializes writers across the persist step
    write_lock: Mutex<()>,
}

impl LabelCache {
    /// Load the cache from `path`.
    ///
    /// A missing, unreadable or invalid store yields an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(entries) => {
                    tracing::info!(path = %path.display(), entries = entries.len(), "Loaded label cache");
                    entries
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Invalid label store, starting empty: {}", e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No label store found, starting empty");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Unreadable label store, starting empty: {}", e);
                HashMap::new()
            }
        };

        Self::with_entries(path, entries)
    }

    fn with_entries(path: PathBuf, entries: HashMap<String, String>) -> Self {
        Self {
            inner: Arc::new(LabelCacheInner {
                path,
                entries: RwLock::new(entries),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.inner.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Record a confirmed transcription and persist the whole map.
    ///
    /// On a persistence failure the in-memory map is left unchanged.
    pub fn record(&self, key: impl Into<String>, text: impl Into<String>) -> Result<(), LabelError> {
        self.record_many([(key.into(), text.into())]).map(|_| ())
    }

    /// Record a batch of transcriptions with a single persist.
    ///
    /// Returns the number of entries applied.
    pub fn record_many(
        &self,
        batch: impl IntoIterator<Item = (String, String)>,
    ) -> Result<usize, LabelError> {
        let _writer = self.inner.write_lock.lock();

        let mut updated = self.inner.entries.read().clone();
        let mut applied = 0;
        for (key, text) in batch {
            updated.insert(key, text);
            applied += 1;
        }

        persist(&self.inner.path, &updated)?;
        *self.inner.entries.write() = updated;

        tracing::debug!(path = %self.inner.path.display(), applied, "Label cache updated");
        Ok(applied)
    }
}

/// Write the map to a temporary sibling and rename it over `path`
fn persist(path: &Path, entries: &HashMap<String, String>) -> Result<(), LabelError> {
    // Sorted keys keep the file diffable
    let sorted: std::collections::BTreeMap<&String, &String> = entries.iter().collect();
    let json = serde_json::to_string_pretty(&sorted)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LabelError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "labels".to_string());
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    std::fs::write(&temp_path, json).map_err(|e| LabelError::io(&temp_path, e))?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(LabelError::io(path, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_store_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LabelCache::open(temp_dir.path().join("labels.json"));

        assert!(cache.is_empty());
        assert_eq!(cache.lookup("uploads/a.jpg"), None);
    }

    #[test]
    fn test_invalid_store_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labels.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = LabelCache::open(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_round_trip_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labels.json");

        let cache = LabelCache::open(&path);
        cache
            .record("uploads/rx1.jpg", "Amoxicillin 500 mg twice daily")
            .unwrap();
        assert_eq!(
            cache.lookup("uploads/rx1.jpg").as_deref(),
            Some("Amoxicillin 500 mg twice daily")
        );

        let reloaded = LabelCache::open(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.lookup("uploads/rx1.jpg").as_deref(),
            Some("Amoxicillin 500 mg twice daily")
        );

        let raw: HashMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_record_overwrites_existing_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = LabelCache::open(temp_dir.path().join("labels.json"));

        cache.record("a.png", "first").unwrap();
        cache.record("a.png", "second").unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("a.png").as_deref(), Some("second"));
    }

    #[test]
    fn test_record_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store").join("labels.json");

        LabelCache::open(&path).record("a.png", "text").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the store file should be makes the rename fail
        let path = temp_dir.path().join("labels.json");
        std::fs::create_dir(&path).unwrap();

        let cache = LabelCache::open(&path);
        let result = cache.record("a.png", "text");

        assert!(matches!(result, Err(LabelError::Io { .. })));
        assert_eq!(cache.lookup("a.png"), None);
        assert!(cache.is_empty());

        // No temporary files left behind
        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_record_many_persists_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labels.json");
        let cache = LabelCache::open(&path);

        let applied = cache
            .record_many(vec![
                ("a.png".to_string(), "one".to_string()),
                ("b.jpg".to_string(), "two".to_string()),
            ])
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(LabelCache::open(&path).len(), 2);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labels.json");
        let cache = LabelCache::open(&path);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache
                        .record(format!("img{}.png", i), format!("label {}", i))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        let reloaded = LabelCache::open(&path);
        assert_eq!(reloaded.len(), 8);
        assert_eq!(reloaded.lookup("img3.png").as_deref(), Some("label 3"));
    }
}
