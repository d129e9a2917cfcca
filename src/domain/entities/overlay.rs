//! Remote overlay catalog entries.

use serde::{Deserialize, Serialize};

/// One entry of the remote overlay catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayModel {
    /// Unique overlay id.
    pub overlay_id: i64,
    /// Display name.
    pub overlay_name: String,
    /// Small preview icon.
    pub overlay_preview_icon_url: String,
    /// Full-resolution overlay asset.
    pub overlay_url: String,
}

/// The catalog endpoint returns a bare JSON array.
pub type OverlayResponse = Vec<OverlayModel>;

/// Returns the overlay selected by a picker index.
///
/// Index 0 is the "no overlay" slot, so index `i` selects entry `i - 1`.
#[must_use]
pub fn overlay_at(overlays: &[OverlayModel], index: usize) -> Option<&OverlayModel> {
    index.checked_sub(1).and_then(|i| overlays.get(i))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_camel_case_array() {
        let json = r#"[{"overlayId":3,"overlayName":"Bokeh","overlayPreviewIconUrl":"https://x/i.png","overlayUrl":"https://x/o.png"}]"#;
        let list: OverlayResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].overlay_id, 3);
        assert_eq!(list[0].overlay_name, "Bokeh");
        assert_eq!(list[0].overlay_url, "https://x/o.png");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&fixtures::overlay(1)).unwrap();
        assert!(json.contains("\"overlayPreviewIconUrl\""));
        assert!(!json.contains("overlay_url"));
    }

    #[test]
    fn test_overlay_at_skips_none_slot() {
        let list = vec![fixtures::overlay(10), fixtures::overlay(20)];
        assert!(overlay_at(&list, 0).is_none());
        assert_eq!(overlay_at(&list, 1).map(|o| o.overlay_id), Some(10));
        assert_eq!(overlay_at(&list, 2).map(|o| o.overlay_id), Some(20));
        assert!(overlay_at(&list, 3).is_none());
    }
}
