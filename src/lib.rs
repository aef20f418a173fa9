// Library exports for the comic-page annotation pipeline
//
// detect text regions -> filter -> translate (fail-soft) -> redact and overlay

pub mod core;
pub mod orchestration;
pub mod pipeline;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::Config,
    errors::{ConfigError, DetectionError, PipelineError, RenderingError, TranslationError},
    types::{
        AnnotatedImage, AnnotatedPage, AnnotationReport, BatchResult, BatchSummary, CoverRectMode,
        DetectedRegion, ImageInput, ImageStage, PageResult, Point, TranslationResult,
    },
};

pub use orchestration::BatchOrchestrator;

pub use pipeline::{AnnotationPipeline, Compositor, RegionFilter};

pub use services::{
    ChatTranslationClient, RemoteOcrDetector, TextRegionDetector, TextRenderer,
    TranslationBackend, TranslationCache, Translator,
};

pub use utils::{decode_image, normalize_rgb, Metrics};
