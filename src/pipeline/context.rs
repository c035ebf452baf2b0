use std::sync::Arc;

use crate::agents::AgentRegistry;
use crate::cache::CacheManager;
use crate::config::Config;
use crate::llm::CompletionService;

/// 一次运行共享的依赖
#[derive(Clone)]
pub struct PipelineContext {
    /// 配置
    pub config: Config,
    /// Agent注册表
    pub registry: Arc<AgentRegistry>,
    /// 模型调用边界
    pub completion: Arc<dyn CompletionService>,
    /// 缓存管理器
    pub cache_manager: Arc<CacheManager>,
}

impl PipelineContext {
    /// 使用任意 `CompletionService` 创建上下文
    pub fn with_completion(config: Config, completion: Arc<dyn CompletionService>) -> Self {
        let registry = Arc::new(AgentRegistry::new(&config.agents));
        let cache_manager = Arc::new(CacheManager::new(config.cache.clone()));
        Self {
            config,
            registry,
            completion,
            cache_manager,
        }
    }
}
