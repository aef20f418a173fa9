// Batch Orchestrator: runs the annotation pipeline over many images
//
// Images are processed strictly one after another. A failure is recorded
// against the image that caused it and the batch moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::types::{AnnotatedPage, BatchResult, ImageInput, PageResult};
use crate::pipeline::AnnotationPipeline;
use crate::utils::{encode_jpeg_async, Metrics};

/// Main batch orchestrator
pub struct BatchOrchestrator {
    pipeline: Arc<AnnotationPipeline>,
    output_dir: Option<PathBuf>,
    jpeg_quality: u8,
    metrics: Metrics,
}

impl BatchOrchestrator {
    pub fn new(pipeline: Arc<AnnotationPipeline>, jpeg_quality: u8, metrics: Metrics) -> Self {
        Self {
            pipeline,
            output_dir: None,
            jpeg_quality,
            metrics,
        }
    }

    /// Write every annotated page into `dir` as `<uuid>.jpg`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build the pipeline and orchestrator from config, saving into `OUTPUT_DIR`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let metrics = Metrics::new();
        let pipeline = AnnotationPipeline::from_config(config, metrics.clone())?;
        Ok(Self::new(Arc::new(pipeline), config.jpeg_quality(), metrics)
            .with_output_dir(config.output_dir().clone()))
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Process in-memory images. Yields one result per input, in input order.
    #[instrument(skip(self, images), fields(total_images = images.len()))]
    pub async fn process_batch(&self, images: Vec<ImageInput>) -> BatchResult {
        let start_time = Instant::now();
        info!("Processing {} images", images.len());

        let mut results = Vec::with_capacity(images.len());
        for input in images {
            let outcome = self.process_image(&input).await;
            results.push(self.finish_page(input.index, input.filename, outcome));
        }

        self.collect(results, start_time)
    }

    /// Read images from disk and process them. Unreadable files fail individually.
    #[instrument(skip(self, paths), fields(total_images = paths.len()))]
    pub async fn process_files(&self, paths: &[PathBuf]) -> BatchResult {
        let start_time = Instant::now();
        info!("Processing {} files", paths.len());

        let mut results = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let filename = path.display().to_string();
            let outcome = match read_image_file(path).await {
                Ok(bytes) => {
                    let input = ImageInput::new(index, filename.clone(), bytes);
                    self.process_image(&input).await
                }
                Err(e) => Err(e),
            };
            results.push(self.finish_page(index, filename, outcome));
        }

        self.collect(results, start_time)
    }

    async fn process_image(&self, input: &ImageInput) -> PipelineResult<AnnotatedPage> {
        let annotated = self.pipeline.annotate(input.image_bytes.clone()).await?;
        let jpeg_bytes = encode_jpeg_async(annotated.image, self.jpeg_quality).await?;

        let output_path = match &self.output_dir {
            Some(dir) => Some(write_output(dir, &jpeg_bytes).await?),
            None => None,
        };

        Ok(AnnotatedPage {
            jpeg_bytes,
            output_path,
            report: annotated.report,
        })
    }

    fn finish_page(
        &self,
        index: usize,
        filename: String,
        outcome: PipelineResult<AnnotatedPage>,
    ) -> PageResult {
        match &outcome {
            Ok(page) => info!(
                "✓ [{}] {} ({} regions, {} fallback)",
                index,
                filename,
                page.report.regions_accepted(),
                page.report.translations_failed
            ),
            Err(e) => error!("✗ [{}] {} failed at {:?}: {}", index, filename, e.stage(), e),
        }
        self.metrics.record_image(outcome.is_ok());

        PageResult {
            index,
            filename,
            outcome,
        }
    }

    fn collect(&self, results: Vec<PageResult>, start_time: Instant) -> BatchResult {
        let successful = results.iter().filter(|r| r.is_success()).count();
        let total = results.len();
        let processing_time = start_time.elapsed();

        info!(
            "✓ Batch complete: {}/{} succeeded in {:.2}s",
            successful,
            total,
            processing_time.as_secs_f64()
        );

        BatchResult {
            total,
            successful,
            failed: total - successful,
            processing_time,
            results,
        }
    }
}

async fn read_image_file(path: &Path) -> PipelineResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Save under a fresh unique name; the input file is never touched
async fn write_output(dir: &Path, jpeg_bytes: &[u8]) -> PipelineResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| PipelineError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(format!("{}.jpg", Uuid::new_v4().simple()));
    tokio::fs::write(&path, jpeg_bytes)
        .await
        .map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
