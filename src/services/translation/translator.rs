use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::errors::TranslationError;
use crate::core::types::TranslationResult;
use crate::services::translation::{TranslationBackend, TranslationCache};
use crate::utils::Metrics;

/// Fail-soft translator.
///
/// Wraps a [`TranslationBackend`] so that every call produces displayable
/// text. Any backend failure (transport, HTTP status, malformed or empty reply,
/// missing credentials, timeout) becomes a fallback result instead of an error.
#[derive(Clone)]
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
    cache: Option<TranslationCache>,
    timeout: Option<Duration>,
    metrics: Option<Metrics>,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self {
            backend,
            cache: None,
            timeout: None,
            metrics: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Translate one region's text. Never fails.
    pub async fn translate(&self, text: &str) -> TranslationResult {
        let source = text.trim();

        let start = Instant::now();
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(source)) {
            debug!("Cache hit for {:?}", source);
            if let Some(ref m) = self.metrics {
                m.record_translation(true, start.elapsed());
            }
            return TranslationResult::translated(text, hit);
        }

        let outcome = self.call_backend(source).await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(translated) => {
                if let Some(ref cache) = self.cache {
                    cache.put(source, &translated);
                }
                TranslationResult::translated(text, translated)
            }
            Err(e) => {
                warn!("Translation failed for {:?}, using fallback: {}", source, e);
                TranslationResult::fallback(text)
            }
        };

        if let Some(ref m) = self.metrics {
            m.record_translation(result.succeeded, elapsed);
        }
        result
    }

    async fn call_backend(&self, source: &str) -> Result<String, TranslationError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.translate(source))
                .await
                .map_err(|_| TranslationError::Timeout(limit))?,
            None => self.backend.translate(source).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::TranslateResult;
    use crate::core::types::FALLBACK_MARKER;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UppercaseBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationBackend for UppercaseBackend {
        async fn translate(&self, text: &str) -> TranslateResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.to_uppercase())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl TranslationBackend for FailingBackend {
        async fn translate(&self, _text: &str) -> TranslateResult<String> {
            Err(TranslationError::Backend {
                status: 429,
                message: "rate limited".to_string(),
            })
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl TranslationBackend for SlowBackend {
        async fn translate(&self, text: &str) -> TranslateResult<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(text.to_string())
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let translator = Translator::new(Arc::new(UppercaseBackend {
            calls: AtomicUsize::new(0),
        }));

        let result = translator.translate("hello").await;
        assert!(result.succeeded);
        assert_eq!(result.original_text, "hello");
        assert_eq!(result.translated_text, "HELLO");
    }

    #[tokio::test]
    async fn test_failure_becomes_fallback() {
        let metrics = Metrics::new();
        let translator = Translator::new(Arc::new(FailingBackend)).with_metrics(metrics.clone());

        let result = translator.translate("こんにちは").await;
        assert!(result.is_fallback());
        assert_eq!(result.translated_text, "[Error] こんにちは");
        assert!(result.translated_text.starts_with(FALLBACK_MARKER));
        assert_eq!(metrics.snapshot().translations_fallback, 1);
    }

    #[tokio::test]
    async fn test_timeout_becomes_fallback() {
        let translator =
            Translator::new(Arc::new(SlowBackend)).with_timeout(Duration::from_millis(100));

        let result = translator.translate("遅い").await;
        assert!(result.is_fallback());
        assert_eq!(result.translated_text, "[Error] 遅い");
    }

    #[tokio::test]
    async fn test_cache_skips_second_backend_call() {
        let backend = Arc::new(UppercaseBackend {
            calls: AtomicUsize::new(0),
        });
        let metrics = Metrics::new();
        let translator = Translator::new(backend.clone())
            .with_cache(TranslationCache::new(16, "test", Some(metrics.clone())))
            .with_metrics(metrics.clone());

        let first = translator.translate("  abc ").await;
        let second = translator.translate("abc").await;

        assert_eq!(first.translated_text, "ABC");
        assert_eq!(second.translated_text, "ABC");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // A cached answer still counts as a successful translation
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.translations_succeeded, 2);
        assert_eq!(snapshot.translations_fallback, 0);
        assert_eq!(snapshot.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_fallbacks_are_not_cached() {
        let cache = TranslationCache::new(16, "test", None).unwrap();
        let translator = Translator::new(Arc::new(FailingBackend)).with_cache(Some(cache.clone()));

        translator.translate("x").await;
        assert!(cache.is_empty());
    }
}
