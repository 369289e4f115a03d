use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roadseg::{
    create_device, get_backend_name, run_evaluation, run_submission, EvaluationConfig,
    RoadSegConfig, SelectedBackend, SubmissionConfig,
};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "roadseg")]
#[command(about = "Patch-level evaluation and submission for aerial road segmentation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score predicted masks against ground truth
    Evaluate {
        /// Directory of predicted masks
        #[arg(short, long)]
        predictions: PathBuf,

        /// Directory of ground-truth masks with matching file names
        #[arg(short, long)]
        groundtruth: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the report as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Write the patch-level submission CSV
    Submit {
        /// Directory of predicted masks named after the test images
        #[arg(short, long)]
        predictions: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration
    Config {
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show backend information
    Info,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env();
    let filter = if env::var("RUST_LOG").is_err() {
        filter.add_directive(LevelFilter::INFO.into())
    } else {
        filter
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).compact())
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RoadSegConfig> {
    match path {
        Some(path) => RoadSegConfig::load(path),
        None => Ok(RoadSegConfig::new()),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let device = create_device();
    tracing::info!(backend = get_backend_name(), "using backend");

    match cli.command {
        Commands::Evaluate {
            predictions,
            groundtruth,
            config,
            report,
        } => {
            let config = load_config(config.as_ref())?;
            let summary = run_evaluation::<SelectedBackend>(
                &EvaluationConfig::new(predictions, groundtruth),
                &config.metric,
                &device,
            )?;

            println!("Images:         {}", summary.num_images);
            println!("Pixel accuracy: {:.5}", summary.pixel_accuracy);
            println!("Pixel F1:       {:.5}", summary.pixel_f1);
            println!("Patch accuracy: {:.5}", summary.patch_accuracy);
            println!("Patch F1:       {:.5}", summary.patch_f1);

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&summary)?;
                fs::write(&path, json)
                    .with_context(|| format!("failed to write report '{}'", path.display()))?;
                tracing::info!(path = %path.display(), "report written");
            }
            Ok(())
        }

        Commands::Submit {
            predictions,
            output,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            let rows = run_submission::<SelectedBackend>(
                &SubmissionConfig::new(predictions, &output),
                &config.metric.patch,
                &device,
            )?;
            println!("Wrote {rows} rows to {}", output.display());
            Ok(())
        }

        Commands::Config { output } => {
            RoadSegConfig::new()
                .save(&output)
                .with_context(|| format!("failed to write config '{}'", output.display()))?;
            println!("Default configuration written to {}", output.display());
            Ok(())
        }

        Commands::Info => {
            let config = RoadSegConfig::new();
            println!("Road segmentation tooling:");
            println!("  Backend: {}", get_backend_name());
            println!("  Device: {device:?}");
            println!("  Patch size: {}", config.metric.patch.patch_size);
            println!("  Cutoff: {}", config.metric.patch.cutoff);
            println!("  Loss weight: {}", config.loss.weight);
            Ok(())
        }
    }
}
