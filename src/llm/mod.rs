//! 模型调用边界：任务管理器只依赖 `CompletionService`，具体实现由 `client` 提供

use anyhow::Result;
use async_trait::async_trait;

pub mod client;
pub mod tools;

/// 单次补全请求
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// 发起请求的Agent id
    pub agent_id: String,
    /// 由Agent角色渲染出的系统提示词
    pub system_prompt: String,
    /// 阶段描述、期望输出等组成的用户提示词
    pub user_prompt: String,
    /// 是否为该请求挂载工具
    pub use_tools: bool,
}

/// 文本补全服务
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
