// Text region detection
//
// The OCR engine itself lives outside this crate. `TextRegionDetector` is the
// contract the pipeline consumes; `RemoteOcrDetector` speaks to an OCR server
// over HTTP.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::core::config::DetectionConfig;
use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::{DetectedRegion, Point};
use crate::utils::encode_png;

/// Detects text regions over a whole decoded image.
///
/// Implementations must return regions in a stable order; the pipeline paints
/// them in exactly that order.
#[async_trait]
pub trait TextRegionDetector: Send + Sync {
    async fn detect(&self, image: &RgbImage) -> DetectionResult<Vec<DetectedRegion>>;
}

/// Request body sent to the OCR server
#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    /// Base64-encoded PNG
    image: String,
    languages: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    regions: Vec<OcrRegion>,
}

#[derive(Debug, Deserialize)]
struct OcrRegion {
    polygon: Vec<[f32; 2]>,
    text: String,
    confidence: f32,
}

impl OcrRegion {
    fn into_region(self, position: usize) -> DetectionResult<DetectedRegion> {
        if self.polygon.len() < 3 {
            return Err(DetectionError::InvalidResponse(format!(
                "region {} has {} polygon points (need at least 3)",
                position,
                self.polygon.len()
            )));
        }
        if !self.confidence.is_finite() {
            return Err(DetectionError::InvalidResponse(format!(
                "region {} has non-finite confidence",
                position
            )));
        }

        let polygon = self.polygon.into_iter().map(Point::from).collect();
        Ok(DetectedRegion::new(
            polygon,
            self.text,
            self.confidence.clamp(0.0, 1.0),
        ))
    }
}

/// Parse the OCR server's JSON reply, preserving region order.
fn parse_ocr_response(body: &str) -> DetectionResult<Vec<DetectedRegion>> {
    let response: OcrResponse = serde_json::from_str(body)
        .map_err(|e| DetectionError::InvalidResponse(e.to_string()))?;

    response
        .regions
        .into_iter()
        .enumerate()
        .map(|(position, region)| region.into_region(position))
        .collect()
}

/// HTTP client for an OCR server
///
/// Sends `{"image": <base64 png>, "languages": [...]}` and expects
/// `{"regions": [{"polygon": [[x, y], ...], "text": "...", "confidence": 0.9}]}`.
pub struct RemoteOcrDetector {
    endpoint: String,
    languages: Vec<String>,
    http_client: reqwest::Client,
}

impl RemoteOcrDetector {
    pub fn new(config: &DetectionConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create OCR HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            languages: config.languages.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl TextRegionDetector for RemoteOcrDetector {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    async fn detect(&self, image: &RgbImage) -> DetectionResult<Vec<DetectedRegion>> {
        let start = Instant::now();

        let png_bytes = encode_png(image)?;
        let request = OcrRequest {
            image: general_purpose::STANDARD.encode(&png_bytes),
            languages: &self.languages,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DetectionError::Backend {
                status: status.as_u16(),
                message: body,
            });
        }

        let regions = parse_ocr_response(&body)?;
        debug!(
            "OCR returned {} regions in {:.0}ms",
            regions.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(regions)
    }
}
