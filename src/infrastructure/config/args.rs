use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::app_config::LogLevel;
use crate::application::services::{BlendMode, DEFAULT_BINS};

#[derive(Debug, Parser)]
#[command(
    name = "lenso",
    version,
    about = "Overlay compositing with a content-addressed image cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Overlay catalog base URL.
    #[arg(long, value_name = "URL", global = true)]
    pub catalog_url: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, value_name = "SECS", global = true)]
    pub request_timeout: Option<u64>,

    /// Cache root directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_root: Option<PathBuf>,

    /// Maximum age of cached and exported files, in days.
    #[arg(long, global = true)]
    pub max_age_days: Option<u64>,

    /// Maximum total size of each cache directory, in bytes.
    #[arg(long, global = true)]
    pub max_total_bytes: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh the overlay catalog and list it.
    Catalog,
    /// Compose a base image with an overlay and export the result.
    Compose(ComposeArgs),
    /// Render a luminance histogram chart of an image.
    Histogram(HistogramArgs),
    /// Evict old files from the image cache and export directories.
    Prune,
}

#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// Base image file.
    pub base: PathBuf,

    /// Overlay image URL.
    #[arg(long, conflicts_with = "overlay_index")]
    pub overlay_url: Option<String>,

    /// Overlay by catalog position (1-based, 0 for none).
    #[arg(long)]
    pub overlay_index: Option<usize>,

    /// Canvas width; defaults to the base image width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height; defaults to the base image height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Overlay blend mode.
    #[arg(long, value_enum)]
    pub blend: Option<BlendMode>,

    /// Horizontal overlay offset in canvas pixels.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub pan_x: f64,

    /// Vertical overlay offset in canvas pixels.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub pan_y: f64,

    /// Overlay scale factor.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// Overlay rotation in degrees.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotate: f64,

    /// Also write a histogram chart of the result to this path.
    #[arg(long, value_name = "PATH")]
    pub histogram: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HistogramArgs {
    /// Input image file.
    pub input: PathBuf,

    /// Output PNG path.
    #[arg(short, long, default_value = "histogram.png")]
    pub output: PathBuf,

    /// Chart width in pixels.
    #[arg(long, default_value_t = 256)]
    pub width: u32,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 100)]
    pub height: u32,

    /// Number of histogram bins.
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,
}
