//! Overlay catalog refresh with local fallback.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::application::dto::{CatalogOrigin, CatalogSnapshot, EditorEvent, EventSender, emit};
use crate::domain::entities::{OverlayModel, overlay_at};
use crate::domain::errors::CatalogError;
use crate::domain::ports::CatalogPort;
use crate::infrastructure::catalog::OverlayStore;

/// Loads the overlay list, serving the local copy first and the network second.
pub struct CatalogUseCase {
    catalog_port: Arc<dyn CatalogPort>,
    store: OverlayStore,
    events: Option<EventSender>,
    overlays: RwLock<Vec<OverlayModel>>,
}

impl CatalogUseCase {
    /// Creates new catalog use case.
    #[must_use]
    pub fn new(catalog_port: Arc<dyn CatalogPort>, store: OverlayStore) -> Self {
        Self {
            catalog_port,
            store,
            events: None,
            overlays: RwLock::new(Vec::new()),
        }
    }

    /// Publishes `OverlaysUpdated` and `Failed` events to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Refreshes the overlay list.
    ///
    /// A non-empty local copy is published immediately. The remote list replaces it
    /// on success and is saved for next time. A network failure is only reported when
    /// there was nothing cached to show.
    ///
    /// # Errors
    /// Returns the fetch error if the network fails and no local copy exists.
    pub async fn refresh(&self) -> Result<CatalogSnapshot, CatalogError> {
        let cached = self.store.load().await;
        if !cached.is_empty() {
            debug!(count = cached.len(), "Serving cached overlay catalog");
            self.publish(cached.clone(), CatalogOrigin::Cache);
        }

        match self.catalog_port.fetch_overlays().await {
            Ok(fresh) => {
                if let Err(e) = self.store.save(&fresh).await {
                    warn!(error = %e, "Failed to save overlay catalog");
                }
                info!(count = fresh.len(), "Overlay catalog refreshed");
                self.publish(fresh.clone(), CatalogOrigin::Network);
                Ok(CatalogSnapshot {
                    overlays: fresh,
                    origin: CatalogOrigin::Network,
                })
            }
            Err(e) if cached.is_empty() => {
                warn!(error = %e, "Overlay catalog unavailable");
                emit(
                    self.events.as_ref(),
                    EditorEvent::Failed {
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Overlay catalog fetch failed, keeping cached list");
                Ok(CatalogSnapshot {
                    overlays: cached,
                    origin: CatalogOrigin::Cache,
                })
            }
        }
    }

    /// Returns the current overlay list.
    #[must_use]
    pub fn overlays(&self) -> Vec<OverlayModel> {
        self.overlays.read().clone()
    }

    /// Returns the overlay for a picker index; index 0 means none.
    #[must_use]
    pub fn overlay_at(&self, index: usize) -> Option<OverlayModel> {
        overlay_at(&self.overlays.read(), index).cloned()
    }

    fn publish(&self, overlays: Vec<OverlayModel>, origin: CatalogOrigin) {
        *self.overlays.write() = overlays.clone();
        emit(
            self.events.as_ref(),
            EditorEvent::OverlaysUpdated { overlays, origin },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::overlay;
    use crate::domain::ports::mocks::MockCatalogPort;
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    fn failing_port() -> MockCatalogPort {
        let mut port = MockCatalogPort::new();
        port.expect_fetch_overlays()
            .times(1)
            .returning(|| Err(CatalogError::fetch_failed("HTTP 503")));
        port
    }

    fn serving_port(list: Vec<OverlayModel>) -> MockCatalogPort {
        let mut port = MockCatalogPort::new();
        port.expect_fetch_overlays()
            .times(1)
            .returning(move || Ok(list.clone()));
        port
    }

    #[tokio::test]
    async fn test_fresh_list_is_saved_and_published() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(dir.path());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let use_case = CatalogUseCase::new(Arc::new(serving_port(vec![overlay(1), overlay(2)])), store.clone())
            .with_events(tx);

        let snapshot = assert_ok!(use_case.refresh().await);

        assert_eq!(snapshot.origin, CatalogOrigin::Network);
        assert_eq!(store.load().await, vec![overlay(1), overlay(2)]);
        assert_eq!(
            rx.try_recv().unwrap(),
            EditorEvent::OverlaysUpdated {
                overlays: vec![overlay(1), overlay(2)],
                origin: CatalogOrigin::Network,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cached_list_is_published_before_network() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(dir.path());
        store.save(&[overlay(7)]).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let use_case = CatalogUseCase::new(Arc::new(serving_port(vec![overlay(8)])), store)
            .with_events(tx);

        assert_ok!(use_case.refresh().await);

        let first = rx.try_recv().unwrap();
        assert!(matches!(
            first,
            EditorEvent::OverlaysUpdated { origin: CatalogOrigin::Cache, .. }
        ));
        let second = rx.try_recv().unwrap();
        assert!(matches!(
            second,
            EditorEvent::OverlaysUpdated { origin: CatalogOrigin::Network, .. }
        ));
        assert_eq!(use_case.overlays(), vec![overlay(8)]);
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_to_cache_silently() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::in_dir(dir.path());
        store.save(&[overlay(3)]).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let use_case = CatalogUseCase::new(Arc::new(failing_port()), store).with_events(tx);

        let snapshot = assert_ok!(use_case.refresh().await);

        assert_eq!(snapshot.origin, CatalogOrigin::Cache);
        assert_eq!(snapshot.overlays, vec![overlay(3)]);
        assert!(matches!(rx.try_recv().unwrap(), EditorEvent::OverlaysUpdated { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_network_failure_without_cache_reports_error() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let use_case =
            CatalogUseCase::new(Arc::new(failing_port()), OverlayStore::in_dir(dir.path()))
                .with_events(tx);

        let err = assert_err!(use_case.refresh().await);

        assert!(err.is_recoverable());
        assert!(matches!(rx.try_recv().unwrap(), EditorEvent::Failed { .. }));
        assert!(use_case.overlays().is_empty());
    }

    #[tokio::test]
    async fn test_overlay_at_reserves_index_zero() {
        let dir = tempdir().unwrap();
        let use_case = CatalogUseCase::new(
            Arc::new(serving_port(vec![overlay(10), overlay(11)])),
            OverlayStore::in_dir(dir.path()),
        );
        assert_ok!(use_case.refresh().await);

        assert_eq!(use_case.overlay_at(0), None);
        assert_eq!(use_case.overlay_at(1), Some(overlay(10)));
        assert_eq!(use_case.overlay_at(2), Some(overlay(11)));
        assert_eq!(use_case.overlay_at(3), None);
    }
}
