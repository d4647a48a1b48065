//! `label_image` CLI - Label a raster image with a pre-trained model.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use label_image::image::PixelLayout;
use label_image::pipeline::{
    format_best_match, NormalizeParams, DEFAULT_LABELS_FILE, DEFAULT_MODEL_FILE,
};
use label_image::{Classifier, Config};

/// Label a raster image with a pre-trained classification model.
#[derive(Parser, Debug)]
#[command(name = "label_image")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory containing the model graph and the label list.
    #[arg(value_name = "MODEL_DIR")]
    model_dir: PathBuf,

    /// Image to label (GeoTIFF, or any format the image crate reads).
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Model graph file name inside MODEL_DIR.
    #[arg(long, default_value = DEFAULT_MODEL_FILE, value_name = "FILE")]
    model_file: String,

    /// Label list file name inside MODEL_DIR, one label per line.
    #[arg(long, default_value = DEFAULT_LABELS_FILE, value_name = "FILE")]
    labels_file: String,

    /// Height the model expects.
    #[arg(long, default_value = "224", value_name = "INT")]
    height: usize,

    /// Width the model expects.
    #[arg(long, default_value = "224", value_name = "INT")]
    width: usize,

    /// Mean subtracted from every sample, or one per channel (comma separated).
    #[arg(long, default_value = "117", value_delimiter = ',', value_name = "FLOAT")]
    mean: Vec<f32>,

    /// Scale every centered sample is divided by, or one per channel.
    #[arg(long, default_value = "1", value_delimiter = ',', value_name = "FLOAT")]
    scale: Vec<f32>,

    /// Channel order the model was trained with (interleaved or planar).
    #[arg(long, default_value = "interleaved", value_name = "LAYOUT", value_parser = parse_layout)]
    layout: PixelLayout,

    /// Model input fed with the normalized image.
    #[arg(long, default_value = label_image::model::DEFAULT_INPUT_NAME, value_name = "NAME")]
    input_name: String,

    /// Model output holding the label probabilities.
    #[arg(long, default_value = label_image::model::DEFAULT_OUTPUT_NAME, value_name = "NAME")]
    output_name: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_layout(s: &str) -> std::result::Result<PixelLayout, String> {
    s.parse::<PixelLayout>().map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("label_image={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(err) = run(args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: Args) -> Result<()> {
    let start = Instant::now();

    let config = Config {
        model_dir: args.model_dir,
        model_file: args.model_file,
        labels_file: args.labels_file,
        normalize: NormalizeParams {
            height: args.height,
            width: args.width,
            mean: args.mean,
            scale: args.scale,
        },
        layout: args.layout,
        input_name: args.input_name,
        output_name: args.output_name,
    };

    let mut classifier = Classifier::new(config).context("Failed to initialize classifier")?;

    let best = classifier
        .classify(&args.image)
        .with_context(|| format!("Failed to label {}", args.image.display()))?;

    println!("{}", format_best_match(&best));
    println!("{}", start.elapsed().as_millis());

    Ok(())
}
