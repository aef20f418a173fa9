use crate::core::types::DetectedRegion;

/// Default minimum detector confidence for a region to be translated
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Decides whether a detected region is worth translating.
///
/// Pure predicate: rejects low-confidence detections and regions whose text
/// is empty after trimming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFilter {
    min_confidence: f32,
}

impl RegionFilter {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn accept(&self, region: &DetectedRegion) -> bool {
        // NaN confidence fails the comparison and is rejected
        region.confidence >= self.min_confidence && !region.source_text.trim().is_empty()
    }
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}
