// Data model for the annotation workflow

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::errors::PipelineError;

/// Marker prefixed to text that could not be translated
pub const FALLBACK_MARKER: &str = "[Error]";

/// A polygon vertex in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// One text region as returned by the detector
///
/// `polygon` keeps the detector's point order (usually a clockwise
/// quadrilateral starting top-left).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub polygon: Vec<Point>,
    pub source_text: String,
    pub confidence: f32,
}

impl DetectedRegion {
    pub fn new(polygon: Vec<Point>, source_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            polygon,
            source_text: source_text.into(),
            confidence,
        }
    }

    /// Axis-aligned quadrilateral from `(x1, y1)` to `(x2, y2)`, clockwise from top-left
    pub fn from_rect(x1: f32, y1: f32, x2: f32, y2: f32, source_text: impl Into<String>, confidence: f32) -> Self {
        Self::new(
            vec![
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ],
            source_text,
            confidence,
        )
    }
}

/// How the covering rectangle is derived from a region polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoverRectMode {
    /// Min/max over every polygon vertex
    #[default]
    BoundingBox,
    /// First and third vertices as opposite corners
    Corners,
}

impl std::str::FromStr for CoverRectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bounding-box" | "bbox" => Ok(CoverRectMode::BoundingBox),
            "corners" => Ok(CoverRectMode::Corners),
            other => Err(other.to_string()),
        }
    }
}

/// Outcome of translating one region's text
///
/// A failed translation still carries displayable text: the original
/// prefixed with [`FALLBACK_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    pub succeeded: bool,
}

impl TranslationResult {
    pub fn translated(original_text: impl Into<String>, translated_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            translated_text: translated_text.into(),
            succeeded: true,
        }
    }

    pub fn fallback(original_text: impl Into<String>) -> Self {
        let original_text = original_text.into();
        let translated_text = format!("{} {}", FALLBACK_MARKER, original_text);
        Self {
            original_text,
            translated_text,
            succeeded: false,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !self.succeeded
    }
}

/// Progress of a single image through the pipeline.
///
/// `Received -> Decoded -> Detected -> (Filtered -> Translated -> Composited)* -> Finalized`.
/// The per-region states repeat once per accepted region; a rejected region
/// stops at `Filtered`. There is no `Failed` variant: a failed image is an
/// `Err(PipelineError)` and [`PipelineError::stage`] names the last state it
/// reached. Variants are ordered by progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImageStage {
    Received,
    Decoded,
    Detected,
    Filtered,
    Translated,
    Composited,
    Finalized,
}

/// Per-image counters and the ordered translations of accepted regions
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationReport {
    pub regions_detected: usize,
    pub regions_rejected: usize,
    pub translations_succeeded: usize,
    pub translations_failed: usize,
    /// Translations of accepted regions, in detector order
    pub translations: Vec<TranslationResult>,
    pub elapsed: Duration,
}

impl AnnotationReport {
    pub fn regions_accepted(&self) -> usize {
        self.regions_detected - self.regions_rejected
    }

    pub fn record(&mut self, result: TranslationResult) {
        if result.succeeded {
            self.translations_succeeded += 1;
        } else {
            self.translations_failed += 1;
        }
        self.translations.push(result);
    }
}

/// The finished canvas for one image
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image: RgbImage,
    pub report: AnnotationReport,
}

/// Raw input image for batch processing
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub index: usize,
    pub filename: String,
    pub image_bytes: Arc<Vec<u8>>,
}

impl ImageInput {
    pub fn new(index: usize, filename: impl Into<String>, image_bytes: Vec<u8>) -> Self {
        Self {
            index,
            filename: filename.into(),
            image_bytes: Arc::new(image_bytes),
        }
    }
}

/// Encoded output for one successfully processed image
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    pub jpeg_bytes: Vec<u8>,
    pub output_path: Option<PathBuf>,
    pub report: AnnotationReport,
}

/// Result for one image of a batch
#[derive(Debug)]
pub struct PageResult {
    pub index: usize,
    pub filename: String,
    pub outcome: Result<AnnotatedPage, PipelineError>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Results for a whole batch, one entry per input in input order
#[derive(Debug)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing_time: Duration,
    pub results: Vec<PageResult>,
}

impl BatchResult {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            successful: self.successful,
            failed: self.failed,
            processing_time_ms: self.processing_time.as_secs_f64() * 1000.0,
            results: self.results.iter().map(PageSummary::from).collect(),
        }
    }
}

/// Serializable view of a [`PageResult`]
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub index: usize,
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<ImageStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub regions_detected: usize,
    pub regions_translated: usize,
    pub translations_failed: usize,
}

impl From<&PageResult> for PageSummary {
    fn from(page: &PageResult) -> Self {
        match &page.outcome {
            Ok(annotated) => Self {
                index: page.index,
                filename: page.filename.clone(),
                success: true,
                output_path: annotated.output_path.clone(),
                failed_at: None,
                error: None,
                regions_detected: annotated.report.regions_detected,
                regions_translated: annotated.report.translations_succeeded,
                translations_failed: annotated.report.translations_failed,
            },
            Err(e) => Self {
                index: page.index,
                filename: page.filename.clone(),
                success: false,
                output_path: None,
                failed_at: Some(e.stage()),
                error: Some(e.to_string()),
                regions_detected: 0,
                regions_translated: 0,
                translations_failed: 0,
            },
        }
    }
}

/// Serializable batch summary (CLI `--json` output)
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing_time_ms: f64,
    pub results: Vec<PageSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_marked() {
        let result = TranslationResult::fallback("こんにちは");
        assert!(result.is_fallback());
        assert_eq!(result.translated_text, "[Error] こんにちは");
        assert_eq!(result.original_text, "こんにちは");

        let ok = TranslationResult::translated("こんにちは", "Hello");
        assert!(!ok.is_fallback());
        assert!(!ok.translated_text.starts_with(FALLBACK_MARKER));
    }

    #[test]
    fn test_report_counts() {
        let mut report = AnnotationReport {
            regions_detected: 4,
            regions_rejected: 1,
            ..Default::default()
        };
        report.record(TranslationResult::translated("a", "A"));
        report.record(TranslationResult::fallback("b"));
        report.record(TranslationResult::translated("c", "C"));

        assert_eq!(report.regions_accepted(), 3);
        assert_eq!(report.translations_succeeded, 2);
        assert_eq!(report.translations_failed, 1);
        assert_eq!(report.translations[1].original_text, "b");
    }

    #[test]
    fn test_region_from_rect_is_clockwise() {
        let region = DetectedRegion::from_rect(10.0, 20.0, 50.0, 40.0, "text", 0.9);
        assert_eq!(region.polygon.len(), 4);
        assert_eq!(region.polygon[0], Point::new(10.0, 20.0));
        assert_eq!(region.polygon[2], Point::new(50.0, 40.0));
    }
}
