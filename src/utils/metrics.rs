use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Latency samples kept per backend; older samples are dropped first
pub const MAX_LATENCY_SAMPLES: usize = 1024;

/// Metrics collector for the annotation workflow.
///
/// Tracks image outcomes, region filtering, translation fallbacks, cache
/// performance and backend latency. Cheap to clone and shareable.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    // Image outcomes
    images_processed: AtomicUsize,
    images_failed: AtomicUsize,

    // Regions
    regions_detected: AtomicUsize,
    regions_rejected: AtomicUsize,

    // Translations
    translations_succeeded: AtomicUsize,
    translations_fallback: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,

    // Backend latency, most recent MAX_LATENCY_SAMPLES only
    detection_latency_ms: RwLock<VecDeque<u64>>,
    translation_latency_ms: RwLock<VecDeque<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                images_processed: AtomicUsize::new(0),
                images_failed: AtomicUsize::new(0),
                regions_detected: AtomicUsize::new(0),
                regions_rejected: AtomicUsize::new(0),
                translations_succeeded: AtomicUsize::new(0),
                translations_fallback: AtomicUsize::new(0),
                cache_hits: AtomicUsize::new(0),
                cache_misses: AtomicUsize::new(0),
                detection_latency_ms: RwLock::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES)),
                translation_latency_ms: RwLock::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES)),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn record_image(&self, success: bool) {
        if success {
            self.inner.images_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.images_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_detection(&self, regions: usize, duration: Duration) {
        self.inner.regions_detected.fetch_add(regions, Ordering::Relaxed);
        push_sample(&self.inner.detection_latency_ms, duration);
    }

    pub fn record_region_rejected(&self) {
        self.inner.regions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translation(&self, succeeded: bool, duration: Duration) {
        if succeeded {
            self.inner.translations_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.translations_fallback.fetch_add(1, Ordering::Relaxed);
        }
        push_sample(&self.inner.translation_latency_ms, duration);
    }

    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let detection: Vec<u64> = self.inner.detection_latency_ms.read().iter().copied().collect();
        let detection_latency_avg_ms = avg(&detection);

        let translation: Vec<u64> = self.inner.translation_latency_ms.read().iter().copied().collect();
        let translation_latency_avg_ms = avg(&translation);
        let translation_latency_p95_ms = percentile(&translation, 0.95);

        let cache_hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.inner.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;
        let cache_hit_rate = if cache_total > 0 {
            cache_hits as f64 / cache_total as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            images_processed: self.inner.images_processed.load(Ordering::Relaxed),
            images_failed: self.inner.images_failed.load(Ordering::Relaxed),
            regions_detected: self.inner.regions_detected.load(Ordering::Relaxed),
            regions_rejected: self.inner.regions_rejected.load(Ordering::Relaxed),
            translations_succeeded: self.inner.translations_succeeded.load(Ordering::Relaxed),
            translations_fallback: self.inner.translations_fallback.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            cache_hit_rate,
            detection_latency_avg_ms,
            translation_latency_avg_ms,
            translation_latency_p95_ms,
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }

    /// Generate Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP images_processed_total Images annotated successfully
# TYPE images_processed_total counter
images_processed_total {}

# HELP images_failed_total Images that failed decoding or detection
# TYPE images_failed_total counter
images_failed_total {}

# HELP regions_detected_total Text regions returned by the detector
# TYPE regions_detected_total counter
regions_detected_total {}

# HELP regions_rejected_total Regions skipped by the confidence/content filter
# TYPE regions_rejected_total counter
regions_rejected_total {}

# HELP translations_total Translation attempts by outcome
# TYPE translations_total counter
translations_total{{outcome="translated"}} {}
translations_total{{outcome="fallback"}} {}

# HELP translation_cache_hit_rate Cache hit rate (0.0 to 1.0)
# TYPE translation_cache_hit_rate gauge
translation_cache_hit_rate {}

# HELP backend_latency_avg_ms Average backend latency in milliseconds
# TYPE backend_latency_avg_ms gauge
backend_latency_avg_ms{{backend="detection"}} {}
backend_latency_avg_ms{{backend="translation"}} {}

# HELP uptime_seconds Process uptime in seconds
# TYPE uptime_seconds counter
uptime_seconds {}
"#,
            s.images_processed,
            s.images_failed,
            s.regions_detected,
            s.regions_rejected,
            s.translations_succeeded,
            s.translations_fallback,
            s.cache_hit_rate,
            s.detection_latency_avg_ms,
            s.translation_latency_avg_ms,
            s.uptime_seconds,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub images_processed: usize,
    pub images_failed: usize,
    pub regions_detected: usize,
    pub regions_rejected: usize,
    pub translations_succeeded: usize,
    pub translations_fallback: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_hit_rate: f64,
    pub detection_latency_avg_ms: u64,
    pub translation_latency_avg_ms: u64,
    pub translation_latency_p95_ms: u64,
    pub uptime_seconds: u64,
}

fn push_sample(samples: &RwLock<VecDeque<u64>>, duration: Duration) {
    let mut samples = samples.write();
    if samples.len() == MAX_LATENCY_SAMPLES {
        samples.pop_front();
    }
    samples.push_back(duration.as_millis() as u64);
}

fn percentile(values: &[u64], p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = ((values.len() as f64 - 1.0) * p) as usize;
    sorted[idx]
}

fn avg(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<u64>() / values.len() as u64
}
