pub mod cache;
pub mod chat_client;
pub mod translator;

use async_trait::async_trait;

use crate::core::errors::TranslateResult;

pub use cache::TranslationCache;
pub use chat_client::ChatTranslationClient;
pub use translator::Translator;

/// A remote service that turns source text into target-language text.
///
/// Implementations may fail; [`Translator`] converts failures into fallback text.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str) -> TranslateResult<String>;
}
