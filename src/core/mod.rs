pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{
    ConfigError, DetectionError, PipelineError, RenderingError, TranslationError,
};
pub use types::{
    AnnotatedImage, AnnotatedPage, AnnotationReport, BatchResult, BatchSummary, CoverRectMode,
    DetectedRegion, ImageInput, ImageStage, PageResult, Point, TranslationResult,
    FALLBACK_MARKER,
};
