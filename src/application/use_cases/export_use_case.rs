//! Export use case implementation.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::dto::CompositionSnapshot;
use crate::application::services::ImageCompositor;
use crate::domain::errors::ExportError;
use crate::infrastructure::export::ExportStore;
use crate::infrastructure::image::{EvictionPolicy, PruneReport};

/// Result of a successful export.
#[derive(Debug)]
pub struct ExportOutcome {
    /// Path of the written file.
    pub path: PathBuf,
    /// Eviction pass started after the write; awaiting it is optional.
    pub eviction: JoinHandle<PruneReport>,
}

/// Composes a snapshot, writes it to the export directory and prunes old exports.
#[derive(Debug, Clone)]
pub struct ExportUseCase {
    compositor: ImageCompositor,
    store: Arc<ExportStore>,
    policy: EvictionPolicy,
}

impl ExportUseCase {
    /// Creates new export use case.
    #[must_use]
    pub fn new(store: Arc<ExportStore>, policy: EvictionPolicy) -> Self {
        Self {
            compositor: ImageCompositor::new(),
            store,
            policy,
        }
    }

    /// Executes the export.
    ///
    /// Composition and encoding run on a blocking task. Eviction is started in the
    /// background and does not delay the result.
    ///
    /// # Errors
    /// Returns `Compose` for an empty canvas, `EncodeFailed` if no encoder works and
    /// `Io` if the file cannot be written.
    pub async fn execute(&self, snapshot: CompositionSnapshot) -> Result<ExportOutcome, ExportError> {
        debug!(
            width = snapshot.canvas_size.width,
            height = snapshot.canvas_size.height,
            "Starting export"
        );

        let compositor = self.compositor;
        let store = Arc::clone(&self.store);
        let path = tokio::task::spawn_blocking(move || {
            let image = snapshot.compose(&compositor)?;
            store.save(&image)
        })
        .await
        .map_err(|e| ExportError::Task {
            message: e.to_string(),
        })??;

        info!(path = %path.display(), "Export finished");
        let eviction = self.policy.spawn_prune(self.store.export_dir().to_path_buf());
        Ok(ExportOutcome { path, eviction })
    }
}
