//! Events published by the editing session and the catalog use case.

use tokio::sync::mpsc;
use tracing::trace;

use super::CatalogOrigin;
use crate::domain::entities::OverlayModel;

/// Sender half of the editor event channel.
pub type EventSender = mpsc::UnboundedSender<EditorEvent>;

/// State changes observers react to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A new base image was set.
    BaseImageUpdated {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// An overlay image was placed on the canvas.
    OverlayApplied {
        /// Generation of the request that produced it.
        generation: u64,
        /// Source URL, when loaded through the cache.
        url: Option<String>,
    },
    /// The overlay was removed.
    OverlayCleared,
    /// The overlay catalog changed.
    OverlaysUpdated {
        /// Current overlay list.
        overlays: Vec<OverlayModel>,
        /// Where the list came from.
        origin: CatalogOrigin,
    },
    /// An operation failed and nothing usable is available.
    Failed {
        /// Human-readable reason.
        message: String,
    },
}

/// Sends `event` if a sender is attached. A closed channel is not an error.
pub fn emit(sender: Option<&EventSender>, event: EditorEvent) {
    if let Some(sender) = sender {
        if sender.send(event).is_err() {
            trace!("Editor event receiver dropped");
        }
    }
}
