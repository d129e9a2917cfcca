//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{AppConfig, CacheConfig, CatalogConfig, ExportConfig, LogLevel};
pub use args::{CliArgs, Command, ComposeArgs, HistogramArgs};
pub use storage::{ConfigError, StorageManager};
