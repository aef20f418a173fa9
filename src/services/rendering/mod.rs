use cosmic_text::{
    fontdb, Attrs, Buffer, Color as CosmicColor, Family, FontSystem, Metrics, Shaping, SwashCache,
    Wrap,
};
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::errors::{RenderingError, RenderingResult};

/// Fonts tried when no explicit font file is configured.
/// CJK-capable faces first so untranslated fallback text still renders.
const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "fonts/default.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Fixed-size, single-line text renderer backed by cosmic-text.
///
/// Text is drawn unwrapped at the configured size; it is never fitted to the
/// region it annotates. Glyph coverage is alpha-blended onto the canvas and
/// clipped at the canvas edges.
pub struct TextRenderer {
    font_system: Mutex<FontSystem>,
    swash_cache: Mutex<SwashCache>,
    font_size: f32,
    has_fonts: bool,
}

impl TextRenderer {
    /// Load fonts from `font_path`, or from the default candidate list when `None`.
    ///
    /// An explicit path that cannot be read, or that holds no usable face, is an
    /// error. Missing default candidates are not: the renderer then draws nothing.
    pub fn new(font_path: Option<&Path>, font_size: f32) -> RenderingResult<Self> {
        let mut db = fontdb::Database::new();

        match font_path {
            Some(path) => {
                let data = std::fs::read(path).map_err(|source| RenderingError::FontLoadError {
                    path: path.to_path_buf(),
                    source,
                })?;
                db.load_font_data(data);
                if db.is_empty() {
                    return Err(RenderingError::NoFontData(path.to_path_buf()));
                }
                info!("✓ Font loaded from {}", path.display());
            }
            None => {
                for candidate in DEFAULT_FONT_CANDIDATES {
                    if let Ok(data) = std::fs::read(candidate) {
                        db.load_font_data(data);
                        debug!("✓ Font: {}", candidate);
                    }
                }
                if db.is_empty() {
                    warn!("⚠ No font found; translated text will not be drawn");
                }
            }
        }

        Ok(Self::with_database(db, font_size))
    }

    /// Renderer without any font faces. Redaction still works; text draws are no-ops.
    pub fn without_fonts(font_size: f32) -> Self {
        Self::with_database(fontdb::Database::new(), font_size)
    }

    fn with_database(db: fontdb::Database, font_size: f32) -> Self {
        let has_fonts = !db.is_empty();
        if has_fonts {
            let families: Vec<String> = db
                .faces()
                .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
                .collect();
            debug!("Font faces available: {:?}", families);
        }

        Self {
            font_system: Mutex::new(FontSystem::new_with_locale_and_db("en-US".to_string(), db)),
            swash_cache: Mutex::new(SwashCache::new()),
            font_size,
            has_fonts,
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn has_fonts(&self) -> bool {
        self.has_fonts
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw_text(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        if !self.has_fonts || text.trim().is_empty() {
            return;
        }

        let line_height = (self.font_size * 1.2).ceil();

        let buffer = {
            let mut font_system = self.font_system.lock();
            let mut buffer = Buffer::new(&mut font_system, Metrics::new(self.font_size, line_height));

            // One line, no wrapping
            buffer.set_size(&mut font_system, None, Some(line_height));
            buffer.set_wrap(&mut font_system, Wrap::None);

            let attrs = Attrs::new().family(Family::SansSerif);
            buffer.set_text(&mut font_system, text, &attrs, Shaping::Advanced);
            buffer.shape_until_scroll(&mut font_system, false);
            buffer
        };

        let cosmic_color = CosmicColor::rgb(color[0], color[1], color[2]);
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);

        let mut font_system = self.font_system.lock();
        let mut swash_cache = self.swash_cache.lock();

        buffer.draw(
            &mut font_system,
            &mut swash_cache,
            cosmic_color,
            |px_x, px_y, w, h, pixel_color| {
                let alpha = pixel_color.a() as f32 / 255.0;
                if alpha <= 0.0 {
                    return;
                }
                let inv_alpha = 1.0 - alpha;

                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let img_x = x + px_x + dx;
                        let img_y = y + px_y + dy;
                        if img_x < 0 || img_y < 0 || img_x >= width || img_y >= height {
                            continue;
                        }

                        let existing = canvas.get_pixel(img_x as u32, img_y as u32);
                        let blended = Rgb([
                            (pixel_color.r() as f32 * alpha + existing[0] as f32 * inv_alpha) as u8,
                            (pixel_color.g() as f32 * alpha + existing[1] as f32 * inv_alpha) as u8,
                            (pixel_color.b() as f32 * alpha + existing[2] as f32 * inv_alpha) as u8,
                        ]);
                        canvas.put_pixel(img_x as u32, img_y as u32, blended);
                    }
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// First default font candidate present on this machine
    fn find_default_font() -> Option<PathBuf> {
        DEFAULT_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
    }

    #[test]
    fn test_missing_explicit_font_is_error() {
        let err = TextRenderer::new(Some(Path::new("/nonexistent/font.ttf")), 16.0)
            .err()
            .unwrap();
        assert!(matches!(err, RenderingError::FontLoadError { .. }));
    }

    #[test]
    fn test_garbage_font_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();

        let err = TextRenderer::new(Some(&path), 16.0).err().unwrap();
        assert!(matches!(err, RenderingError::NoFontData(_)));
    }

    #[test]
    fn test_without_fonts_draws_nothing() {
        let renderer = TextRenderer::without_fonts(16.0);
        assert!(!renderer.has_fonts());

        let mut canvas = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        renderer.draw_text(&mut canvas, "Hello", 0, 0, Rgb([255, 255, 255]));
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_draw_clips_to_canvas() {
        let Some(path) = find_default_font() else {
            return;
        };
        let renderer = TextRenderer::new(Some(&path), 24.0).unwrap();

        let mut canvas = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        // Anchored partly off-canvas; must not panic
        renderer.draw_text(&mut canvas, "Overflowing text", -5, -5, Rgb([255, 255, 255]));
        renderer.draw_text(&mut canvas, "Overflowing text", 8, 8, Rgb([255, 255, 255]));
    }
}
