//! LLM客户端 - 基于rig实现 `CompletionService`

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rig::completion::PromptError;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, LLMConfig};
use crate::llm::tools::AgentTools;
use crate::llm::{CompletionRequest, CompletionService};

mod providers;

use providers::ProviderClient;

/// LLM客户端
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
    tools: AgentTools,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: &Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        let tools = AgentTools::new(&config.research)?;
        Ok(Self {
            config: config.llm.clone(),
            client,
            tools,
        })
    }

    /// 检查模型连接是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!(
            "🔄 Checking model connection ({} / {})...",
            self.config.provider, self.config.model
        );
        let agent = self
            .client
            .create_agent("You are a helpful assistant.", &self.config);
        match self.with_timeout(agent.prompt("Hello")).await {
            Ok(_) => {
                println!("✅ Model connection OK");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ Model connection failed: {}", e);
                Err(e)
            }
        }
    }

    async fn prompt_once(&self, request: &CompletionRequest) -> Result<String> {
        if request.use_tools {
            let agent = self.client.create_agent_with_tools(
                &request.system_prompt,
                &self.config,
                &self.tools,
            );
            agent
                .multi_turn(&request.user_prompt, self.config.max_tool_turns)
                .await
                .map_err(|e| match e {
                    PromptError::MaxDepthError { max_depth, .. } => anyhow!(
                        "agent '{}' did not finish within {} tool turns",
                        request.agent_id,
                        max_depth
                    ),
                    other => anyhow!("agent '{}' failed: {}", request.agent_id, other),
                })
        } else {
            let agent = self
                .client
                .create_agent(&request.system_prompt, &self.config);
            agent.prompt(&request.user_prompt).await
        }
    }

    /// 为单次模型调用加上超时
    async fn with_timeout<F>(&self, call: F) -> Result<String>
    where
        F: std::future::Future<Output = Result<String>>,
    {
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "model call timed out after {}s",
                self.config.timeout_seconds
            )),
        }
    }
}

#[async_trait]
impl CompletionService for LLMClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!(
            agent = %request.agent_id,
            use_tools = request.use_tools,
            prompt_chars = request.user_prompt.len(),
            "sending completion request"
        );
        self.with_timeout(self.prompt_once(request)).await
    }
}
