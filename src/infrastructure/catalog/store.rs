//! Local fallback copy of the overlay catalog.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::entities::OverlayModel;
use crate::domain::errors::CatalogError;
use crate::infrastructure::image::disk_cache::write_atomic;

/// File name of the catalog copy under the cache root.
pub const CATALOG_FILE_NAME: &str = "overlays.json";

/// Persists the last successfully fetched overlay list as JSON.
#[derive(Debug, Clone)]
pub struct OverlayStore {
    store_path: PathBuf,
}

impl OverlayStore {
    /// Creates a store writing to `store_path`.
    #[must_use]
    pub const fn new(store_path: PathBuf) -> Self {
        Self { store_path }
    }

    /// Creates a store at `<cache_root>/overlays.json`.
    #[must_use]
    pub fn in_dir(cache_root: &Path) -> Self {
        Self::new(cache_root.join(CATALOG_FILE_NAME))
    }

    /// Returns the store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.store_path
    }

    /// Loads the cached list. Missing or unreadable files yield an empty list.
    pub async fn load(&self) -> Vec<OverlayModel> {
        let data = match tokio::fs::read(&self.store_path).await {
            Ok(data) => data,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.store_path.display(), error = %e, "Failed to read overlay store");
                }
                return Vec::new();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(overlays) => overlays,
            Err(e) => {
                warn!(error = %e, "Failed to parse overlay store, ignoring it");
                Vec::new()
            }
        }
    }

    /// Replaces the cached list.
    ///
    /// # Errors
    /// Returns error if the list cannot be serialized or written.
    pub async fn save(&self, overlays: &[OverlayModel]) -> Result<(), CatalogError> {
        let data = serde_json::to_vec_pretty(overlays)?;
        let path = self.store_path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_atomic(&path, &data)
        })
        .await
        .map_err(|e| std::io::Error::other(format!("store task failed: {e}")))??;

        debug!(count = overlays.len(), path = %self.store_path.display(), "Saved overlay store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::overlay;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(dir.path());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(&dir.path().join("caches"));
        let overlays = vec![overlay(1), overlay(2)];

        store.save(&overlays).await.unwrap();
        assert_eq!(store.load().await, overlays);
    }

    #[tokio::test]
    async fn test_save_overwrites_wholesale() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(dir.path());

        store.save(&[overlay(1), overlay(2), overlay(3)]).await.unwrap();
        store.save(&[overlay(9)]).await.unwrap();

        assert_eq!(store.load().await, vec![overlay(9)]);
    }

    #[tokio::test]
    async fn test_malformed_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(dir.path());
        std::fs::write(store.path(), "[{\"overlayId\": ").unwrap();

        assert!(store.load().await.is_empty());
    }
}
