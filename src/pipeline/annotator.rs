use anyhow::Context;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{DetectionError, PipelineResult};
use crate::core::types::{AnnotatedImage, AnnotationReport, DetectedRegion, ImageStage};
use crate::pipeline::{Compositor, RegionFilter};
use crate::services::detection::{RemoteOcrDetector, TextRegionDetector};
use crate::services::rendering::TextRenderer;
use crate::services::translation::{ChatTranslationClient, TranslationCache, Translator};
use crate::utils::{decode_image_async, normalize_rgb, Metrics};

/// Detect → filter → translate → composite, for one image at a time.
///
/// Holds no per-image state: every call owns its own canvas, so one pipeline
/// can serve a whole batch.
pub struct AnnotationPipeline {
    detector: Arc<dyn TextRegionDetector>,
    translator: Translator,
    filter: RegionFilter,
    compositor: Compositor,
    detection_timeout: Option<Duration>,
    metrics: Option<Metrics>,
}

impl AnnotationPipeline {
    pub fn new(
        detector: Arc<dyn TextRegionDetector>,
        translator: Translator,
        filter: RegionFilter,
        compositor: Compositor,
    ) -> Self {
        Self {
            detector,
            translator,
            filter,
            compositor,
            detection_timeout: None,
            metrics: None,
        }
    }

    pub fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = Some(timeout);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Wire up the remote OCR detector, chat translator, cache and renderer from config
    pub fn from_config(config: &Config, metrics: Metrics) -> anyhow::Result<Self> {
        info!("Initializing annotation pipeline...");

        let detector = RemoteOcrDetector::new(&config.detection)
            .context("Failed to initialize OCR detector")?;
        info!("✓ OCR detector: {}", config.detection.endpoint);

        let client = ChatTranslationClient::new(&config.translation)
            .context("Failed to initialize translation client")?;
        if config.translation.api_key.is_none() {
            warn!("⚠ OPENAI_API_KEY not set; every region will use fallback text");
        }
        let cache = TranslationCache::new(
            config.translation.cache_size,
            client.cache_namespace(),
            Some(metrics.clone()),
        );
        let translator = Translator::new(Arc::new(client))
            .with_cache(cache)
            .with_timeout(config.translation.timeout)
            .with_metrics(metrics.clone());
        info!(
            "✓ Translator: {} -> {}",
            config.translation.model, config.translation.target_language
        );

        let renderer = TextRenderer::new(
            config.rendering.font_path.as_deref(),
            config.rendering.font_size,
        )
        .context("Failed to initialize text renderer")?;
        let compositor = Compositor::new(config.rendering.cover_rect_mode, Arc::new(renderer));

        Ok(Self::new(
            Arc::new(detector),
            translator,
            RegionFilter::new(config.detection.min_confidence),
            compositor,
        )
        .with_detection_timeout(config.detection.timeout)
        .with_metrics(metrics))
    }

    /// Decode raw image bytes and annotate them.
    pub async fn annotate(&self, bytes: Arc<Vec<u8>>) -> PipelineResult<AnnotatedImage> {
        let image = decode_image_async(bytes).await?;
        self.annotate_image(&image).await
    }

    /// Annotate an already decoded image. The input is left untouched.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub async fn annotate_image(&self, image: &DynamicImage) -> PipelineResult<AnnotatedImage> {
        let start = Instant::now();
        let mut canvas = normalize_rgb(image);
        debug!("Stage {:?}", ImageStage::Decoded);

        let regions = self.detect(&canvas).await?;
        debug!("Stage {:?}: {} regions", ImageStage::Detected, regions.len());

        let mut report = AnnotationReport {
            regions_detected: regions.len(),
            ..Default::default()
        };

        for (position, region) in regions.iter().enumerate() {
            let accepted = self.filter.accept(region);
            debug!(
                "Region {} stage {:?}: accepted={} (confidence {:.2}, text {:?})",
                position,
                ImageStage::Filtered,
                accepted,
                region.confidence,
                region.source_text
            );
            if !accepted {
                report.regions_rejected += 1;
                if let Some(ref m) = self.metrics {
                    m.record_region_rejected();
                }
                continue;
            }

            let result = self.translator.translate(&region.source_text).await;
            debug!(
                "Region {} stage {:?}: {:?} -> {:?}",
                position,
                ImageStage::Translated,
                result.original_text,
                result.translated_text
            );

            if self.compositor.apply(&mut canvas, region, &result.translated_text).is_none() {
                warn!("Region {} has no drawable area on the canvas", position);
            } else {
                debug!("Region {} stage {:?}", position, ImageStage::Composited);
            }
            report.record(result);
        }

        report.elapsed = start.elapsed();
        info!(
            "Stage {:?}: {}/{} regions annotated ({} fallback) in {:.0}ms",
            ImageStage::Finalized,
            report.regions_accepted(),
            report.regions_detected,
            report.translations_failed,
            report.elapsed.as_secs_f64() * 1000.0
        );

        Ok(AnnotatedImage {
            image: canvas,
            report,
        })
    }

    async fn detect(&self, canvas: &RgbImage) -> PipelineResult<Vec<DetectedRegion>> {
        let start = Instant::now();
        let regions = match self.detection_timeout {
            Some(limit) => tokio::time::timeout(limit, self.detector.detect(canvas))
                .await
                .map_err(|_| DetectionError::Timeout(limit))??,
            None => self.detector.detect(canvas).await?,
        };

        if let Some(ref m) = self.metrics {
            m.record_detection(regions.len(), start.elapsed());
        }
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{DetectionResult, PipelineError, TranslateResult, TranslationError};
    use crate::core::types::CoverRectMode;
    use crate::pipeline::compositor::REDACTION_FILL;
    use crate::services::translation::TranslationBackend;
    use async_trait::async_trait;
    use image::Rgb;
    use parking_lot::Mutex;

    /// Returns a fixed region list
    struct FixedDetector(Vec<DetectedRegion>);

    #[async_trait]
    impl TextRegionDetector for FixedDetector {
        async fn detect(&self, _image: &RgbImage) -> DetectionResult<Vec<DetectedRegion>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    #[async_trait]
    impl TextRegionDetector for BrokenDetector {
        async fn detect(&self, _image: &RgbImage) -> DetectionResult<Vec<DetectedRegion>> {
            Err(DetectionError::Backend {
                status: 503,
                message: "ocr down".to_string(),
            })
        }
    }

    struct HangingDetector;

    #[async_trait]
    impl TextRegionDetector for HangingDetector {
        async fn detect(&self, _image: &RgbImage) -> DetectionResult<Vec<DetectedRegion>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Vec::new())
        }
    }

    /// Records every call; fails for texts listed in `fail_on`
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl TranslationBackend for RecordingBackend {
        async fn translate(&self, text: &str) -> TranslateResult<String> {
            self.calls.lock().push(text.to_string());
            if self.fail_on.iter().any(|t| t == text) {
                return Err(TranslationError::EmptyResponse);
            }
            Ok(format!("EN({})", text))
        }
    }

    fn pipeline(
        detector: Arc<dyn TextRegionDetector>,
        backend: Arc<RecordingBackend>,
    ) -> AnnotationPipeline {
        AnnotationPipeline::new(
            detector,
            Translator::new(backend),
            RegionFilter::default(),
            Compositor::new(
                CoverRectMode::BoundingBox,
                Arc::new(TextRenderer::without_fonts(16.0)),
            ),
        )
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 3) as u8, (y * 5) as u8, 200])
        }))
    }

    #[tokio::test]
    async fn test_zero_regions_is_identity() {
        let input = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            16,
            16,
            image::Rgba([12, 34, 56, 128]),
        ));
        let backend = Arc::new(RecordingBackend::default());
        let pipeline = pipeline(Arc::new(FixedDetector(Vec::new())), backend.clone());

        let annotated = pipeline.annotate_image(&input).await.unwrap();
        assert_eq!(annotated.image, normalize_rgb(&input));
        assert_eq!(annotated.report.regions_detected, 0);
        assert!(backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_region_is_fully_covered() {
        let region = DetectedRegion::from_rect(10.0, 8.0, 40.0, 30.0, "こんにちは", 0.9);
        let backend = Arc::new(RecordingBackend::default());
        let pipeline = pipeline(Arc::new(FixedDetector(vec![region])), backend.clone());
        let input = page();

        let annotated = pipeline.annotate_image(&input).await.unwrap();
        let original = normalize_rgb(&input);

        for y in 8..=30 {
            for x in 10..=40 {
                assert_eq!(*annotated.image.get_pixel(x, y), REDACTION_FILL);
            }
        }
        // Outside the rectangle nothing changes
        assert_eq!(annotated.image.get_pixel(0, 0), original.get_pixel(0, 0));
        assert_eq!(annotated.image.get_pixel(41, 31), original.get_pixel(41, 31));

        assert_eq!(*backend.calls.lock(), vec!["こんにちは".to_string()]);
        assert_eq!(annotated.report.translations[0].translated_text, "EN(こんにちは)");
    }

    #[tokio::test]
    async fn test_rejected_regions_are_skipped_entirely() {
        let regions = vec![
            DetectedRegion::from_rect(0.0, 0.0, 10.0, 10.0, "ノイズ", 0.3),
            DetectedRegion::from_rect(20.0, 20.0, 30.0, 30.0, "   ", 0.99),
        ];
        let backend = Arc::new(RecordingBackend::default());
        let pipeline = pipeline(Arc::new(FixedDetector(regions)), backend.clone());
        let input = page();

        let annotated = pipeline.annotate_image(&input).await.unwrap();
        assert_eq!(annotated.image, normalize_rgb(&input));
        assert_eq!(annotated.report.regions_rejected, 2);
        assert_eq!(annotated.report.regions_accepted(), 0);
        assert!(backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_translation_failure_continues_with_fallback() {
        let regions = vec![
            DetectedRegion::from_rect(0.0, 0.0, 10.0, 10.0, "壊れた", 0.8),
            DetectedRegion::from_rect(20.0, 20.0, 30.0, 30.0, "元気", 0.8),
        ];
        let backend = Arc::new(RecordingBackend {
            fail_on: vec!["壊れた".to_string()],
            ..Default::default()
        });
        let pipeline = pipeline(Arc::new(FixedDetector(regions)), backend.clone());

        let annotated = pipeline.annotate_image(&page()).await.unwrap();
        let report = &annotated.report;

        assert_eq!(report.translations_failed, 1);
        assert_eq!(report.translations_succeeded, 1);
        assert_eq!(report.translations[0].translated_text, "[Error] 壊れた");
        assert_eq!(report.translations[1].translated_text, "EN(元気)");
        // Detector order preserved
        assert_eq!(*backend.calls.lock(), vec!["壊れた".to_string(), "元気".to_string()]);
    }

    #[tokio::test]
    async fn test_detector_failure_is_fatal_for_image() {
        let backend = Arc::new(RecordingBackend::default());
        let pipeline = pipeline(Arc::new(BrokenDetector), backend);

        let err = pipeline.annotate_image(&page()).await.unwrap_err();
        assert!(err.is_detection_error());
        assert_eq!(err.stage(), ImageStage::Decoded);
    }

    #[tokio::test]
    async fn test_detector_timeout_is_detection_error() {
        let backend = Arc::new(RecordingBackend::default());
        let pipeline = pipeline(Arc::new(HangingDetector), backend)
            .with_detection_timeout(Duration::from_millis(50));

        let err = pipeline.annotate_image(&page()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Detection {
                source: DetectionError::Timeout(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_decode_error() {
        let backend = Arc::new(RecordingBackend::default());
        let pipeline = pipeline(Arc::new(FixedDetector(Vec::new())), backend);

        let err = pipeline
            .annotate(Arc::new(b"not an image".to_vec()))
            .await
            .unwrap_err();
        assert!(err.is_decode_error());
    }

    #[tokio::test]
    async fn test_metrics_track_rejections() {
        let metrics = Metrics::new();
        let regions = vec![
            DetectedRegion::from_rect(0.0, 0.0, 10.0, 10.0, "ok", 0.9),
            DetectedRegion::from_rect(0.0, 0.0, 10.0, 10.0, "low", 0.1),
        ];
        let backend = Arc::new(RecordingBackend::default());
        let pipeline =
            pipeline(Arc::new(FixedDetector(regions)), backend).with_metrics(metrics.clone());

        pipeline.annotate_image(&page()).await.unwrap();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.regions_detected, 2);
        assert_eq!(snapshot.regions_rejected, 1);
    }
}
