use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

use crate::config::CacheConfig;

pub mod performance_monitor;
pub use performance_monitor::{CachePerformanceMonitor, CachePerformanceReport};

/// 缓存管理器：以查询的MD5为键，每个查询一个JSON文件
pub struct CacheManager {
    config: CacheConfig,
    performance_monitor: CachePerformanceMonitor,
}

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query: String,
    pub result: String,
    /// 写入时间（UNIX秒）
    pub timestamp: u64,
}

/// 一次清理的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    /// 扫描到的缓存文件数
    pub scanned: usize,
    /// 因过期删除
    pub removed_expired: usize,
    /// 因无法解析删除
    pub removed_invalid: usize,
    /// 因超出容量上限删除
    pub removed_for_size: usize,
    /// 清理后剩余的字节数
    pub remaining_bytes: u64,
}

impl PruneReport {
    pub fn removed(&self) -> usize {
        self.removed_expired + self.removed_invalid + self.removed_for_size
    }
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            performance_monitor: CachePerformanceMonitor::new(),
        }
    }

    /// 生成查询的缓存键：去除首尾空白后的MD5十六进制串
    pub fn key_for(query: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(query.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// 获取缓存文件路径
    pub fn cache_path(&self, query: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("{}.json", Self::key_for(query)))
    }

    /// 检查缓存是否仍在有效期内
    fn is_fresh(&self, timestamp: u64) -> bool {
        now_secs().saturating_sub(timestamp) < self.config.ttl_seconds
    }

    /// 查找缓存。过期条目视为未命中，但不会被删除
    pub async fn lookup(&self, query: &str) -> Option<String> {
        if !self.config.enabled {
            return None;
        }

        let key = Self::key_for(query);
        let cache_path = self.cache_path(query);

        let content = match fs::read_to_string(&cache_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.performance_monitor.record_cache_miss(&key);
                return None;
            }
            Err(e) => {
                self.performance_monitor
                    .record_cache_error(&key, &format!("failed to read cache file: {}", e));
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) if self.is_fresh(entry.timestamp) => {
                self.performance_monitor.record_cache_hit(&key);
                Some(entry.result)
            }
            Ok(_) => {
                debug!(key = %key, "cache entry expired");
                self.performance_monitor.record_cache_miss(&key);
                None
            }
            Err(e) => {
                self.performance_monitor
                    .record_cache_error(&key, &format!("failed to parse cache entry: {}", e));
                None
            }
        }
    }

    /// 写入缓存，覆盖已有条目。失败只记录，不返回错误
    pub async fn store(&self, query: &str, result: &str) {
        if !self.config.enabled {
            return;
        }

        let key = Self::key_for(query);
        let cache_path = self.cache_path(query);

        if let Err(e) = fs::create_dir_all(&self.config.cache_dir).await {
            self.performance_monitor
                .record_cache_error(&key, &format!("failed to create cache dir: {}", e));
            return;
        }

        let entry = CacheEntry {
            query: query.to_string(),
            result: result.to_string(),
            timestamp: now_secs(),
        };

        match serde_json::to_string_pretty(&entry) {
            Ok(content) => match fs::write(&cache_path, content).await {
                Ok(_) => self.performance_monitor.record_cache_write(&key),
                Err(e) => self
                    .performance_monitor
                    .record_cache_error(&key, &format!("failed to write cache file: {}", e)),
            },
            Err(e) => self
                .performance_monitor
                .record_cache_error(&key, &format!("failed to serialize cache entry: {}", e)),
        }
    }

    /// 清理缓存目录：先删除过期与损坏的条目，再从最旧的开始删除直到低于容量上限
    pub async fn prune(&self) -> PruneReport {
        let mut report = PruneReport::default();

        let mut dir = match fs::read_dir(&self.config.cache_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                debug!(error = %e, "cache directory not readable, nothing to prune");
                return report;
            }
        };

        let mut kept: Vec<(PathBuf, u64, u64)> = Vec::new();
        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    self.performance_monitor
                        .record_cache_error("prune", &format!("failed to list cache dir: {}", e));
                    break;
                }
            };

            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            report.scanned += 1;

            let size = item.metadata().await.map(|m| m.len()).unwrap_or(0);
            let parsed = fs::read_to_string(&path)
                .await
                .ok()
                .and_then(|content| serde_json::from_str::<CacheEntry>(&content).ok());

            match parsed {
                None => {
                    if self.remove(&path).await {
                        report.removed_invalid += 1;
                    }
                }
                Some(entry) if !self.is_fresh(entry.timestamp) => {
                    if self.remove(&path).await {
                        report.removed_expired += 1;
                    }
                }
                Some(entry) => kept.push((path, size, entry.timestamp)),
            }
        }

        kept.sort_by_key(|(_, _, timestamp)| *timestamp);
        let mut total: u64 = kept.iter().map(|(_, size, _)| size).sum();
        for (path, size, _) in &kept {
            if total <= self.config.max_size_bytes {
                break;
            }
            if self.remove(path).await {
                total -= size;
                report.removed_for_size += 1;
            }
        }

        report.remaining_bytes = total;
        report
    }

    async fn remove(&self, path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(_) => true,
            Err(e) => {
                self.performance_monitor.record_cache_error(
                    &path.display().to_string(),
                    &format!("failed to remove cache file: {}", e),
                );
                false
            }
        }
    }

    /// 生成性能报告
    pub fn generate_performance_report(&self) -> CachePerformanceReport {
        self.performance_monitor.generate_report()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
