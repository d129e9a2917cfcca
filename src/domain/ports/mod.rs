mod asset_fetch_port;
mod catalog_port;

pub use asset_fetch_port::AssetFetchPort;
pub use catalog_port::CatalogPort;
