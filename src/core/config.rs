use crate::core::errors::ConfigError;
use crate::core::types::CoverRectMode;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: Level,
}

/// Translation backend configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub target_language: String,
    pub timeout: Duration,
    /// LRU entries kept in memory (0 disables caching)
    pub cache_size: usize,
}

/// Detection backend configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub endpoint: String,
    pub languages: Vec<String>,
    pub timeout: Duration,
    pub min_confidence: f32,
}

/// Redaction and text rendering configuration
#[derive(Debug, Clone)]
pub struct RenderingConfig {
    pub cover_rect_mode: CoverRectMode,
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub jpeg_quality: u8,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub translation: TranslationConfig,
    pub detection: DetectionConfig,
    pub rendering: RenderingConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                log_level: Level::INFO,
            },
            translation: TranslationConfig {
                api_key: None,
                api_url: "https://api.openai.com/v1/chat/completions".to_string(),
                model: "gpt-4-1106-preview".to_string(),
                temperature: 0.5,
                target_language: "English".to_string(),
                timeout: Duration::from_secs(60),
                cache_size: 1024,
            },
            detection: DetectionConfig {
                endpoint: "http://127.0.0.1:8866/ocr".to_string(),
                languages: ["en", "ja", "ko", "zh", "fr", "es", "de", "it"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                timeout: Duration::from_secs(120),
                min_confidence: 0.5,
            },
            rendering: RenderingConfig {
                cover_rect_mode: CoverRectMode::BoundingBox,
                font_path: None,
                font_size: 16.0,
            },
            output: OutputConfig {
                output_dir: PathBuf::from("translated"),
                jpeg_quality: 90,
            },
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| parse_level(&s))
            .unwrap_or(defaults.logging.log_level);

        let languages = env::var("OCR_LANGUAGES")
            .ok()
            .map(|langs| {
                langs
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|langs| !langs.is_empty())
            .unwrap_or(defaults.detection.languages);

        let cover_rect_mode = match env::var("COVER_RECT_MODE") {
            Ok(value) => value
                .parse::<CoverRectMode>()
                .map_err(ConfigError::InvalidRectMode)?,
            Err(_) => defaults.rendering.cover_rect_mode,
        };

        Ok(Self {
            logging: LoggingConfig { log_level },
            translation: TranslationConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                api_url: env::var("TRANSLATION_API_URL")
                    .unwrap_or(defaults.translation.api_url),
                model: env::var("TRANSLATION_MODEL").unwrap_or(defaults.translation.model),
                temperature: parse_env("TRANSLATION_TEMPERATURE")?
                    .unwrap_or(defaults.translation.temperature),
                target_language: env::var("TARGET_LANGUAGE")
                    .unwrap_or(defaults.translation.target_language),
                timeout: parse_env::<u64>("TRANSLATION_TIMEOUT_SECONDS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.translation.timeout),
                cache_size: parse_env("TRANSLATION_CACHE_SIZE")?
                    .unwrap_or(defaults.translation.cache_size),
            },
            detection: DetectionConfig {
                endpoint: env::var("OCR_ENDPOINT").unwrap_or(defaults.detection.endpoint),
                languages,
                timeout: parse_env::<u64>("DETECTION_TIMEOUT_SECONDS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.detection.timeout),
                min_confidence: parse_env("MIN_CONFIDENCE")?
                    .unwrap_or(defaults.detection.min_confidence),
            },
            rendering: RenderingConfig {
                cover_rect_mode,
                font_path: env::var("FONT_PATH")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
                font_size: parse_env("FONT_SIZE")?.unwrap_or(defaults.rendering.font_size),
            },
            output: OutputConfig {
                output_dir: env::var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.output.output_dir),
                jpeg_quality: parse_env("JPEG_QUALITY")?.unwrap_or(defaults.output.jpeg_quality),
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.detection.min_confidence,
            ));
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(ConfigError::InvalidTemperature(self.translation.temperature));
        }

        if !(4.0..=256.0).contains(&self.rendering.font_size) {
            return Err(ConfigError::InvalidFontSize(self.rendering.font_size));
        }

        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(self.output.jpeg_quality));
        }

        for endpoint in [&self.detection.endpoint, &self.translation.api_url] {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidEndpoint(endpoint.clone()));
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Level {
        self.logging.log_level
    }

    pub fn min_confidence(&self) -> f32 {
        self.detection.min_confidence
    }

    pub fn target_language(&self) -> &str {
        &self.translation.target_language
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output.output_dir
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.output.jpeg_quality
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Parse an optional environment variable, failing on malformed values
fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarError(format!("{}={:?}", name, raw))),
        Err(_) => Ok(None),
    }
}
