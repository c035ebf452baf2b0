//! 单次查询内的阶段结果存储，按 `scope:key` 组织，不落盘

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 各阶段已校验的结果
pub const STAGE_RESULTS: &str = "stage_results";
/// 已完成任务的id
pub const COMPLETED_TASKS: &str = "completed_tasks";

/// Memory元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub access_counts: HashMap<String, u64>,
    pub data_sizes: HashMap<String, usize>,
    pub total_size: usize,
}

impl Default for MemoryMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_updated: now,
            access_counts: HashMap::new(),
            data_sizes: HashMap::new(),
            total_size: 0,
        }
    }
}

/// 结果存储
#[derive(Debug, Default)]
pub struct Memory {
    data: HashMap<String, Value>,
    metadata: MemoryMetadata,
}

fn full_key(scope: &str, key: &str) -> String {
    format!("{}:{}", scope, key)
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 存储数据，同一键的旧值被覆盖
    pub fn store<T>(&mut self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        let full_key = full_key(scope, key);
        let serialized = serde_json::to_value(data)?;
        let data_size = serialized.to_string().len();

        if let Some(old_size) = self.metadata.data_sizes.insert(full_key.clone(), data_size) {
            self.metadata.total_size -= old_size;
        }
        self.metadata.total_size += data_size;
        self.metadata.last_updated = Utc::now();

        self.data.insert(full_key, serialized);
        Ok(())
    }

    /// 读取数据，类型不匹配时返回None
    pub fn get<T>(&mut self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        let full_key = full_key(scope, key);
        *self
            .metadata
            .access_counts
            .entry(full_key.clone())
            .or_insert(0) += 1;

        self.data
            .get(&full_key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn has_data(&self, scope: &str, key: &str) -> bool {
        self.data.contains_key(&full_key(scope, key))
    }

    /// 清空全部数据与统计
    pub fn clear(&mut self) {
        self.data.clear();
        self.metadata = MemoryMetadata::default();
    }

    pub fn metadata(&self) -> &MemoryMetadata {
        &self.metadata
    }
}
