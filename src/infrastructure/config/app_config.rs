//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::services::BlendMode;
use crate::infrastructure::catalog::CATALOG_FILE_NAME;
use crate::infrastructure::export::{DEFAULT_EXPORT_PREFIX, EXPORT_DIR_NAME};
use crate::infrastructure::image::{EntryPattern, EvictionPolicy, IMAGE_CACHE_DIR_NAME};

pub(crate) const APP_NAME: &str = "lenso";
pub(crate) const APP_QUALIFIER: &str = "app";
pub(crate) const APP_ORGANIZATION: &str = "lenso";

const DEFAULT_CATALOG_BASE_URL: &str = "https://overlays.lenso.app/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_AGE_DAYS: u64 = 7;
const DEFAULT_MAX_TOTAL_BYTES: u64 = 200 * 1024 * 1024;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, loaded from `config.toml` and overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Overlay catalog endpoint.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Disk cache location and limits.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Overlay catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL; the catalog lives at `<base_url>/overlay.json`.
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Request timeout in seconds for catalog and asset downloads.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional bearer token sent with catalog requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            auth_token: None,
        }
    }
}

/// Disk cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for the image cache, exports and catalog copy.
    /// Defaults to the platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Entries older than this many days are evicted.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// Upper bound for the total size of each managed directory.
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// File name prefix for exported images.
    #[serde(default = "default_export_prefix")]
    pub prefix: String,

    /// Blend mode used for the overlay.
    #[serde(default)]
    pub blend_mode: BlendMode,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            prefix: default_export_prefix(),
            blend_mode: BlendMode::default(),
        }
    }
}

fn default_catalog_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_age_days() -> u64 {
    DEFAULT_MAX_AGE_DAYS
}

const fn default_max_total_bytes() -> u64 {
    DEFAULT_MAX_TOTAL_BYTES
}

fn default_export_prefix() -> String {
    DEFAULT_EXPORT_PREFIX.to_string()
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(catalog_url) = &args.catalog_url {
            self.catalog.base_url.clone_from(catalog_url);
        }
        if let Some(timeout) = args.request_timeout {
            self.catalog.request_timeout_secs = timeout;
        }
        if let Some(cache_root) = &args.cache_root {
            self.cache.root = Some(cache_root.clone());
        }
        if let Some(max_age_days) = args.max_age_days {
            self.cache.max_age_days = max_age_days;
        }
        if let Some(max_total_bytes) = args.max_total_bytes {
            self.cache.max_total_bytes = max_total_bytes;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("lenso.log"))
    }

    /// Returns default cache root.
    #[must_use]
    pub fn default_cache_root() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.cache_dir().to_path_buf())
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns effective cache root, falling back to the system temp directory.
    #[must_use]
    pub fn cache_root(&self) -> PathBuf {
        self.cache
            .root
            .clone()
            .or_else(Self::default_cache_root)
            .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
    }

    /// Directory of the content-addressed image cache.
    #[must_use]
    pub fn image_cache_dir(&self) -> PathBuf {
        self.cache_root().join(IMAGE_CACHE_DIR_NAME)
    }

    /// Directory exported images are written to.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.cache_root().join(EXPORT_DIR_NAME)
    }

    /// Path of the local catalog copy.
    #[must_use]
    pub fn catalog_store_path(&self) -> PathBuf {
        self.cache_root().join(CATALOG_FILE_NAME)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.request_timeout_secs)
    }

    /// Eviction policy for the image cache directory.
    #[must_use]
    pub fn image_cache_policy(&self) -> EvictionPolicy {
        EvictionPolicy::new(
            self.cache.max_age_days,
            self.cache.max_total_bytes,
            EntryPattern::ContentAddressed,
        )
    }

    /// Eviction policy for the export directory.
    #[must_use]
    pub fn export_policy(&self) -> EvictionPolicy {
        EvictionPolicy::new(
            self.cache.max_age_days,
            self.cache.max_total_bytes,
            EntryPattern::exports(self.export.prefix.clone()),
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            catalog: CatalogConfig::default(),
            cache: CacheConfig::default(),
            export: ExportConfig::default(),
        }
    }
}
