pub mod detection;
pub mod rendering;
pub mod translation;

// Re-export commonly used services
pub use detection::{RemoteOcrDetector, TextRegionDetector};
pub use rendering::TextRenderer;
pub use translation::{ChatTranslationClient, TranslationBackend, TranslationCache, Translator};
