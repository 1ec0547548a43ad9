// CLI entry for region_compress
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueHint};
use log::{error, info, warn};

use region_compress::core_modules::image_grid::Image;
use region_compress::core_modules::progress::{ConsoleProgress, NoProgress, ProgressObserver};
use region_compress::core_modules::utils::image_helper::image_helper;
use region_compress::{BatchCompressor, CompressionResult, CompressorConfig, FinderKind, ImageCompressor};

#[derive(Parser, Debug)]
#[command(
    name = "region_compress",
    version,
    about = "Lossy image compression by region growing"
)]
struct Cli {
    /// Input image path(s)
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Output image path (single input only)
    #[arg(short = 'o', long = "output", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Similarity threshold in [0, 1]; higher keeps more detail
    #[arg(short = 't', long = "threshold", default_value_t = 0.9)]
    threshold: f64,

    /// Maximum pixels per region
    #[arg(short = 'm', long = "max-region-size")]
    max_region_size: Option<usize>,

    /// Region finder: flood-fill, adaptive or mean-shift
    #[arg(short = 'a', long = "algorithm", default_value_t = FinderKind::Adaptive)]
    algorithm: FinderKind,

    /// Use the base threshold everywhere (adaptive finder)
    #[arg(long = "no-adaptive", action = ArgAction::SetTrue)]
    no_adaptive: bool,

    /// Spatial bandwidth as a fraction of the larger image side (mean-shift finder)
    #[arg(long = "spatial-bandwidth", default_value_t = 0.05)]
    spatial_bandwidth: f64,

    /// Do not draw a progress bar
    #[arg(long = "no-progress", action = ArgAction::SetTrue)]
    no_progress: bool,

    /// Print the report without saving an image
    #[arg(long = "report-only", action = ArgAction::SetTrue)]
    report_only: bool,

    /// Images compressed concurrently (defaults to the CPU count)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> CompressorConfig {
    CompressorConfig {
        similarity_threshold: cli.threshold,
        max_region_size: cli.max_region_size,
        finder: cli.algorithm,
        adaptive_mode: !cli.no_adaptive,
        spatial_bandwidth: cli.spatial_bandwidth,
        ..CompressorConfig::default()
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Prints the report and, unless `report_only`, saves the image and its metadata.
fn finish(
    compressor: &ImageCompressor,
    input: &Path,
    output: Option<&Path>,
    source: &Image,
    result: &CompressionResult,
    report_only: bool,
) -> Result<()> {
    println!("\n{}", input.display());
    println!("{}", result.stats);

    let quality = result.quality(source);
    println!("Mean colour error:   {:.4}", quality.mean_color_error);
    println!("Region variance:     {:.4}", quality.mean_region_variance);
    println!("Edge retention:      {:.2}%", quality.edge_retention * 100.0);

    for anomaly in &result.anomalies {
        warn!("Seed ({}, {}) skipped: {}", anomaly.seed.x, anomaly.seed.y, anomaly.error);
    }
    if result.rejected_pixels > 0 {
        warn!("{} pixels returned by the finder were discarded", result.rejected_pixels);
    }

    if report_only {
        return Ok(());
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| image_helper::default_output_path(input, compressor.config().finder));
    compressor
        .save(result, &output)
        .with_context(|| format!("saving compressed image for {}", input.display()))?;
    let size = std::fs::metadata(&output)
        .with_context(|| format!("reading size of {}", output.display()))?
        .len();
    println!("Compressed image saved to: {}", output.display());
    println!("File size: {:.2} KB", size as f64 / 1024.0);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.output.is_some() && cli.inputs.len() > 1 {
        bail!("--output can only be used with a single input image");
    }

    let batch = BatchCompressor::new(build_config(&cli), cli.jobs).context("invalid configuration")?;

    let cancel = batch.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current region");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    if let [input] = cli.inputs.as_slice() {
        let compressor = batch.compressor().clone();
        let cancel = batch.cancel_flag();
        let path = input.clone();
        let show_progress = !cli.no_progress;

        let (source, result) = tokio::task::spawn_blocking(move || {
            let mut observer: Box<dyn ProgressObserver> = if show_progress {
                Box::new(ConsoleProgress::stderr("Compressing"))
            } else {
                Box::new(NoProgress)
            };
            compressor.compress_file(&path, observer.as_mut(), Some(&cancel))
        })
        .await
        .context("compression worker panicked")?
        .with_context(|| format!("compressing {}", input.display()))?;

        return finish(
            batch.compressor(),
            input,
            cli.output.as_deref(),
            &source,
            &result,
            cli.report_only,
        );
    }

    info!("Compressing {} images", cli.inputs.len());
    let outcomes = batch.compress_files(cli.inputs.clone()).await;
    let mut failures = 0usize;
    for outcome in outcomes {
        let finished = outcome
            .result
            .map_err(anyhow::Error::from)
            .and_then(|(source, result)| {
                finish(batch.compressor(), &outcome.input, None, &source, &result, cli.report_only)
            });
        if let Err(e) = finished {
            error!("{}: {:#}", outcome.input.display(), e);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} images failed", cli.inputs.len());
    }
    Ok(())
}
