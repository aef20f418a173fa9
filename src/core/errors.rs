// Error taxonomy for the annotation workflow
//
// Only decode and detection failures end an image. Translation failures are
// absorbed by the Translator and surface as fallback text in the output.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::types::ImageStage;

/// Detection backend errors
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("OCR request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("OCR backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode image for OCR: {0}")]
    EncodeFailed(#[from] image::ImageError),

    #[error("OCR detection timed out after {0:?}")]
    Timeout(Duration),
}

/// Translation backend errors (never propagated out of `Translator::translate`)
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("No translation API key configured (set OPENAI_API_KEY)")]
    NotConfigured,

    #[error("Translation request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Translation backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid translation response: {0}")]
    InvalidResponse(String),

    #[error("Translation backend returned an empty translation")]
    EmptyResponse,

    #[error("Translation timed out after {0:?}")]
    Timeout(Duration),
}

/// Rendering service errors
#[derive(Debug, Error)]
pub enum RenderingError {
    #[error("Font loading failed for {path}: {source}")]
    FontLoadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No usable font face in {0}")]
    NoFontData(PathBuf),
}

/// Per-image pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image decoding failed: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    #[error("Text detection failed: {source}")]
    Detection {
        #[source]
        source: DetectionError,
    },

    #[error("JPEG encoding failed: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl PipelineError {
    /// The last stage the image reached before failing.
    pub fn stage(&self) -> ImageStage {
        match self {
            PipelineError::Read { .. }
            | PipelineError::Decode { .. }
            | PipelineError::TaskJoinFailed(_) => ImageStage::Received,
            PipelineError::Detection { .. } => ImageStage::Decoded,
            PipelineError::Encode { .. } | PipelineError::Write { .. } => ImageStage::Finalized,
        }
    }

    pub fn is_decode_error(&self) -> bool {
        matches!(self, PipelineError::Decode { .. })
    }

    pub fn is_detection_error(&self) -> bool {
        matches!(self, PipelineError::Detection { .. })
    }
}

impl From<DetectionError> for PipelineError {
    fn from(source: DetectionError) -> Self {
        PipelineError::Detection { source }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Confidence threshold must be in [0.0, 1.0], got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("Temperature must be in [0.0, 2.0], got {0}")]
    InvalidTemperature(f32),

    #[error("Font size must be in [4, 256], got {0}")]
    InvalidFontSize(f32),

    #[error("JPEG quality must be in [1, 100], got {0}")]
    InvalidJpegQuality(u8),

    #[error("Invalid cover rectangle mode: {0} (expected 'bounding-box' or 'corners')")]
    InvalidRectMode(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("Environment variable parsing failed: {0}")]
    EnvVarError(String),
}

pub type DetectionResult<T> = Result<T, DetectionError>;
pub type TranslateResult<T> = Result<T, TranslationError>;
pub type RenderingResult<T> = Result<T, RenderingError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
