mod asset;
mod cache_key;
mod geometry;
mod overlay;
mod transform;

pub use asset::{AssetSource, CachedAsset};
pub use cache_key::{
    CacheKey, DEFAULT_EXTENSION, KEY_HEX_LEN, cache_file_name, url_path_extension,
};
pub use geometry::{aspect_fit_rect, image_size};
#[cfg(test)]
pub(crate) use overlay::fixtures;
pub use overlay::{OverlayModel, OverlayResponse, overlay_at};
pub use transform::{INITIAL_OVERLAY_FRACTION, OverlayTransform, TransformEvent};
