//! Command-line radar renderer.
//!
//! Reads an MRMS `.grib2.gz` (or plain `.grib2`) file, renders it with a
//! color table and writes the PNG overlay next to it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use radar_pipeline::{Pipeline, PipelineConfig, RenderResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "radar-render")]
#[command(about = "Render an MRMS radar grid to a PNG overlay")]
struct Args {
    /// Radar file (.grib2.gz, .grib2)
    input: PathBuf,

    /// Output PNG (default: input name with a .png extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Color table (JSON or YAML)
    #[arg(long, env = "RADAR_COLOR_TABLE")]
    color_table: Option<PathBuf>,

    /// Pipeline config (JSON or YAML)
    #[arg(long, env = "RADAR_CONFIG")]
    config: Option<PathBuf>,

    /// Print the {image_url, bounds, width, height} document to stdout
    #[arg(long)]
    json: bool,

    /// Cap on the decompressed payload size in bytes
    #[arg(long, env = "RADAR_MAX_DECOMPRESSED_BYTES")]
    max_decompressed_bytes: Option<u64>,

    /// Rasterize and encode on rayon's thread pool
    #[arg(long, env = "RADAR_PARALLEL")]
    parallel: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "RADAR_LOG_JSON")]
    log_json: bool,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let (output, result) = run(&args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let [[south, west], [north, east]] = result.bounds.corners();
        println!(
            "{} {}x{} bounds [[{}, {}], [{}, {}]]",
            output.display(),
            result.width,
            result.height,
            south,
            west,
            north,
            east
        );
    }
    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;

    // stdout carries the result; logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Build the pipeline from file config plus CLI overrides.
fn build_pipeline(args: &Args) -> Result<Pipeline> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(table) = &args.color_table {
        config.color_table = Some(table.clone());
    }
    if let Some(max) = args.max_decompressed_bytes {
        config.max_decompressed_bytes = max;
    }
    if args.parallel {
        config.parallel = true;
    }
    Ok(Pipeline::from_config(config)?)
}

fn run(args: &Args) -> Result<(PathBuf, RenderResult)> {
    let pipeline = build_pipeline(args)?;

    let payload = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    info!(path = %args.input.display(), bytes = payload.len(), "Read radar file");

    let result = pipeline
        .render(&payload, None)
        .with_context(|| format!("failed to render {}", args.input.display()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    fs::write(&output, &result.image)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), bytes = result.image.len(), "Wrote PNG overlay");

    Ok((output, result))
}

/// `dir/MRMS_X.latest.grib2.gz` becomes `dir/MRMS_X.latest.png`.
fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "radar".to_string());
    let stem = name
        .strip_suffix(".gz")
        .unwrap_or(&name)
        .trim_end_matches(".grib2");
    input.with_file_name(format!("{}.png", stem))
}
