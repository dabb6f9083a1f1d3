//! stripflood CLI — fill depressions in a DEM across parallel strips

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stripflood_parallel::{run_cluster, DemSource, GeoTiffSink, GeoTiffSource};

#[derive(Parser)]
#[command(name = "stripflood")]
#[command(author, version, about = "Distributed Priority-Flood depression filling", long_about = None)]
struct Cli {
    /// Input DEM (GeoTIFF)
    input: PathBuf,

    /// Number of worker strips (defaults to the number of cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let pb = spinner("Reading DEM...");
    let source = GeoTiffSource::open(&cli.input)
        .with_context(|| format!("Failed to open DEM: {}", cli.input.display()))?;
    pb.finish_and_clear();

    let (rows, cols) = source.dims();
    anyhow::ensure!(rows >= 2, "DEM must have at least two rows, got {}", rows);
    let default_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    // Every strip needs at least its two boundary rows
    let workers = cli.workers.unwrap_or(default_workers).clamp(1, rows / 2);

    info!("Input: {} x {} cells, {} strips", cols, rows, workers);

    let sink = GeoTiffSink::beside(&cli.input, &source, workers)
        .context("Failed to plan output rasters")?;
    let outputs = sink.output_paths().to_vec();

    let start = Instant::now();
    run_cluster(Arc::new(source), Arc::new(sink), workers).context("Fill failed")?;
    let elapsed = start.elapsed();

    for path in &outputs {
        println!("Filled strip saved to: {}", path.display());
    }
    println!("  Processing time: {:.2?}", elapsed);

    Ok(())
}
