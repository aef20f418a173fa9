use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::sync::Arc;
use tracing::debug;

use crate::core::types::{CoverRectMode, DetectedRegion, Point};
use crate::services::rendering::TextRenderer;

/// Opaque fill painted over the source text
pub const REDACTION_FILL: Rgb<u8> = Rgb([0, 0, 0]);
/// Color of the overlaid translation
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Axis-aligned rectangle covering `polygon`, clipped to a `width` x `height` canvas.
///
/// Coordinates are truncated to whole pixels and both ends are inclusive.
/// Returns `None` when the polygon is too short for `mode`, has non-finite
/// coordinates, or lies entirely outside the canvas.
pub fn covering_rect(polygon: &[Point], mode: CoverRectMode, width: u32, height: u32) -> Option<Rect> {
    if width == 0 || height == 0 {
        return None;
    }

    // Only the vertices the mode reads; f32::min/max would silently skip a NaN
    let corners;
    let used: &[Point] = match mode {
        CoverRectMode::BoundingBox => polygon,
        CoverRectMode::Corners => {
            corners = [*polygon.first()?, *polygon.get(2)?];
            &corners
        }
    };
    let (first, rest) = used.split_first()?;
    if !used.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        return None;
    }

    let (x0, y0, x1, y1) = rest.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );

    let (left, top) = (x0.floor() as i64, y0.floor() as i64);
    let (right, bottom) = (x1.floor() as i64, y1.floor() as i64);

    if right < 0 || bottom < 0 || left >= width as i64 || top >= height as i64 {
        return None;
    }

    let left = left.max(0);
    let top = top.max(0);
    let right = right.min(width as i64 - 1);
    let bottom = bottom.min(height as i64 - 1);

    Some(Rect::at(left as i32, top as i32).of_size((right - left + 1) as u32, (bottom - top + 1) as u32))
}

/// Paints over a region's source text and draws its translation in place.
///
/// Mutates the canvas; calls for one image must run strictly in order.
pub struct Compositor {
    mode: CoverRectMode,
    renderer: Arc<TextRenderer>,
}

impl Compositor {
    pub fn new(mode: CoverRectMode, renderer: Arc<TextRenderer>) -> Self {
        Self { mode, renderer }
    }

    pub fn mode(&self) -> CoverRectMode {
        self.mode
    }

    /// Returns the rectangle that was painted, or `None` if the region has no drawable area.
    pub fn apply(&self, canvas: &mut RgbImage, region: &DetectedRegion, text: &str) -> Option<Rect> {
        let (width, height) = canvas.dimensions();
        let Some(rect) = covering_rect(&region.polygon, self.mode, width, height) else {
            debug!("Region {:?} has no drawable area on the {}x{} canvas, skipped", region.source_text, width, height);
            return None;
        };

        draw_filled_rect_mut(canvas, rect, REDACTION_FILL);
        self.renderer
            .draw_text(canvas, text, rect.left(), rect.top(), TEXT_COLOR);

        Some(rect)
    }
}
