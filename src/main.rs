use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use kurbo::{Size, Vec2};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lenso::application::services::DEFAULT_BINS;
use lenso::application::{
    CatalogUseCase, EditingSession, EditorEvent, ExportUseCase, HistogramRenderer,
};
use lenso::domain::entities::TransformEvent;
use lenso::infrastructure::config::{Command, ComposeArgs, HistogramArgs};
use lenso::infrastructure::{
    AppConfig, CatalogClient, CliArgs, DiskImageCache, ExportStore, HttpAssetFetcher,
    OverlayStore, StorageManager,
};

const PREVIEW_HISTOGRAM_SIZE: Size = Size::new(256.0, 100.0);

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn image_cache(config: &AppConfig) -> Result<Arc<DiskImageCache>> {
    let fetcher = Arc::new(HttpAssetFetcher::new(config.request_timeout())?);
    Ok(Arc::new(DiskImageCache::new(config.image_cache_dir(), fetcher)))
}

fn catalog_use_case(config: &AppConfig) -> Result<CatalogUseCase> {
    let client = CatalogClient::new(config.catalog.base_url.clone(), config.request_timeout())?
        .with_auth_token(config.catalog.auth_token.clone());
    Ok(CatalogUseCase::new(
        Arc::new(client),
        OverlayStore::new(config.catalog_store_path()),
    ))
}

async fn run_catalog(config: &AppConfig) -> Result<()> {
    let snapshot = catalog_use_case(config)?.refresh().await?;

    println!("# {} overlays ({})", snapshot.overlays.len(), snapshot.origin);
    for (i, overlay) in snapshot.overlays.iter().enumerate() {
        println!(
            "{}\t{}\t{}\t{}",
            i + 1,
            overlay.overlay_id,
            overlay.overlay_name,
            overlay.overlay_url
        );
    }
    Ok(())
}

async fn run_compose(config: &AppConfig, args: ComposeArgs) -> Result<()> {
    let base = image::open(&args.base)
        .wrap_err_with(|| format!("failed to open {}", args.base.display()))?;
    let cache = image_cache(config)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut session = EditingSession::new(Arc::clone(&cache)).with_events(tx.clone());
    session.set_base_image(&base);
    session.set_canvas_size(Size::new(
        f64::from(args.width.unwrap_or(base.width())),
        f64::from(args.height.unwrap_or(base.height())),
    ));
    session.set_blend_mode(args.blend.unwrap_or(config.export.blend_mode));

    let overlay_url = match (args.overlay_url, args.overlay_index) {
        (Some(url), _) => Some(url),
        (None, Some(index)) => {
            let catalog = catalog_use_case(config)?.with_events(tx);
            catalog.refresh().await?;
            catalog.overlay_at(index).map(|o| o.overlay_url)
        }
        (None, None) => None,
    };

    if let Some(url) = overlay_url {
        session.load_overlay(Some(url.clone()));
        session.settle().await;
        if !session.has_overlay() {
            bail!("overlay {url} could not be loaded");
        }
        session.apply_gesture(TransformEvent::Rotate(args.rotate.to_radians()));
        session.apply_gesture(TransformEvent::Pinch(args.scale));
        session.apply_gesture(TransformEvent::Pan(Vec2::new(args.pan_x, args.pan_y)));
    }

    while let Ok(event) = rx.try_recv() {
        match event {
            EditorEvent::Failed { message } => warn!(message = %message, "Editor reported failure"),
            other => debug!(event = ?other, "Editor event"),
        }
    }

    if let Some(path) = &args.histogram {
        let chart = session
            .histogram_preview(PREVIEW_HISTOGRAM_SIZE, DEFAULT_BINS)
            .ok_or_else(|| eyre!("nothing to render a histogram from"))?;
        chart
            .save(path)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    }

    let exporter = ExportUseCase::new(
        Arc::new(ExportStore::new(config.export_dir(), config.export.prefix.clone())),
        config.export_policy(),
    );
    let outcome = exporter.execute(session.snapshot()).await?;
    println!("{}", outcome.path.display());

    cache.wait_for_pending_writes().await;
    let report = outcome.eviction.await?;
    debug!(removed = report.removed(), "Export directory pruned");
    Ok(())
}

fn run_histogram(args: &HistogramArgs) -> Result<()> {
    let input = image::open(&args.input)
        .wrap_err_with(|| format!("failed to open {}", args.input.display()))?;
    let chart = HistogramRenderer::new()
        .render(
            &input,
            Size::new(f64::from(args.width), f64::from(args.height)),
            args.bins,
        )
        .ok_or_else(|| eyre!("histogram needs a non-empty image, size and bin count"))?;
    chart
        .save(&args.output)
        .wrap_err_with(|| format!("failed to write {}", args.output.display()))?;
    println!("{}", args.output.display());
    Ok(())
}

async fn run_prune(config: &AppConfig) -> Result<()> {
    let targets = [
        (config.image_cache_dir(), config.image_cache_policy()),
        (config.export_dir(), config.export_policy()),
    ];
    for (dir, policy) in targets {
        let report = policy.prune(&dir).await;
        print_report(&dir, report.removed(), report.bytes_freed, report.remaining_bytes);
    }
    Ok(())
}

fn print_report(dir: &Path, removed: usize, freed: u64, remaining: u64) {
    println!(
        "{}: removed {removed} files, freed {freed} bytes, {remaining} bytes remain",
        dir.display()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = lenso::VERSION, "Starting Lenso");

    match args.command {
        Command::Catalog => run_catalog(&config).await,
        Command::Compose(compose) => run_compose(&config, compose).await,
        Command::Histogram(histogram) => run_histogram(&histogram),
        Command::Prune => run_prune(&config).await,
    }
}
