// Command-line entry point: annotate a batch of comic pages

use comic_translate::{core::Config, orchestration::BatchOrchestrator};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Detect, translate and overlay text on comic-page images
#[derive(Parser, Debug)]
#[command(name = "comic-translate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Images to annotate (PNG, JPEG, ...)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Directory for annotated JPEGs (overrides OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the batch summary as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus-format metrics after the batch
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::new().context("Failed to load configuration")?;
    if let Some(dir) = args.output_dir {
        config.output.output_dir = dir;
    }

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "comic_translate={}",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("=== COMIC TRANSLATE ===");
    info!(
        "Target={} MinConfidence={} Output={}",
        config.target_language(),
        config.min_confidence(),
        config.output_dir().display()
    );

    let orchestrator = BatchOrchestrator::from_config(&config)?;
    let batch = orchestrator.process_files(&args.images).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch.summary())?);
    } else {
        for page in &batch.results {
            match &page.outcome {
                Ok(annotated) => println!(
                    "ok    {} -> {} ({} regions, {} untranslated)",
                    page.filename,
                    annotated
                        .output_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    annotated.report.regions_accepted(),
                    annotated.report.translations_failed
                ),
                Err(e) => println!("error {}: {}", page.filename, e),
            }
        }
        println!(
            "{}/{} images annotated in {:.2}s",
            batch.successful,
            batch.total,
            batch.processing_time.as_secs_f64()
        );
    }

    if args.metrics {
        print!("{}", orchestrator.metrics().to_prometheus());
    }

    Ok(if batch.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
