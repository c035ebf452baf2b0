use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// 缓存性能监控器
#[derive(Clone, Default)]
pub struct CachePerformanceMonitor {
    metrics: Arc<CacheMetrics>,
}

/// 缓存指标
#[derive(Default)]
struct CacheMetrics {
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    cache_writes: AtomicUsize,
    cache_errors: AtomicUsize,
}

/// 缓存性能报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePerformanceReport {
    /// 缓存命中率
    pub hit_rate: f64,
    /// 总查找次数
    pub total_operations: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_writes: usize,
    pub cache_errors: usize,
}

impl std::fmt::Display for CachePerformanceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hit rate {:.1}% ({} hits / {} lookups), {} writes, {} errors",
            self.hit_rate * 100.0,
            self.cache_hits,
            self.total_operations,
            self.cache_writes,
            self.cache_errors
        )
    }
}

impl CachePerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录缓存命中
    pub fn record_cache_hit(&self, key: &str) {
        self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
        debug!(key, "cache hit");
    }

    /// 记录缓存未命中
    pub fn record_cache_miss(&self, key: &str) {
        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, "cache miss");
    }

    /// 记录缓存写入
    pub fn record_cache_write(&self, key: &str) {
        self.metrics.cache_writes.fetch_add(1, Ordering::Relaxed);
        debug!(key, "cache write");
    }

    /// 记录缓存错误，错误不会向调用方传播
    pub fn record_cache_error(&self, key: &str, error: &str) {
        self.metrics.cache_errors.fetch_add(1, Ordering::Relaxed);
        warn!(key, error, "cache error");
    }

    /// 生成性能报告
    pub fn generate_report(&self) -> CachePerformanceReport {
        let hits = self.metrics.cache_hits.load(Ordering::Relaxed);
        let misses = self.metrics.cache_misses.load(Ordering::Relaxed);
        let total_operations = hits + misses;

        let hit_rate = if total_operations > 0 {
            hits as f64 / total_operations as f64
        } else {
            0.0
        };

        CachePerformanceReport {
            hit_rate,
            total_operations,
            cache_hits: hits,
            cache_misses: misses,
            cache_writes: self.metrics.cache_writes.load(Ordering::Relaxed),
            cache_errors: self.metrics.cache_errors.load(Ordering::Relaxed),
        }
    }
}
