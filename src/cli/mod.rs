use crate::config::{Config, LLMProvider};
use crate::pipeline::RunMode;
use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

/// llama-search - 由多Agent任务链驱动的终端调研助手
#[derive(Parser, Debug)]
#[command(name = "llama-search")]
#[command(
    about = "A terminal research assistant: your question is researched on the web by one agent, written up by another, validated and cached."
)]
#[command(version)]
pub struct Args {
    /// 要调研的问题，省略时进入交互模式
    pub query: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// LLM Provider (openai, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 模型名称
    #[arg(short, long)]
    pub model: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 每个阶段的最大尝试次数
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// 整个查询的超时时间（秒）
    #[arg(long)]
    pub query_timeout: Option<u64>,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 缓存目录
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// 清理过期与超出容量的缓存后退出
    #[arg(long)]
    pub prune_cache: bool,

    /// 跳过启动时的模型连接检查
    #[arg(long)]
    pub skip_connection_check: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 运行方式
    pub fn run_mode(&self) -> RunMode {
        if self.prune_cache {
            return RunMode::PruneCache;
        }
        match &self.query {
            Some(query) => RunMode::Single(query.clone()),
            None => RunMode::Interactive,
        }
    }

    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可用
            Config::from_file(config_path)?
        } else {
            // 没有显式指定时，尝试从默认位置加载
            let default_config_path = Config::default_path();
            if default_config_path.exists() {
                Config::from_file(&default_config_path)?
            } else {
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            config.llm.provider = provider_str.parse::<LLMProvider>().map_err(|e| anyhow!(e))?;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 任务链配置
        if let Some(max_retries) = self.max_retries {
            config.pipeline.max_retries = max_retries;
        }
        if let Some(query_timeout) = self.query_timeout {
            config.pipeline.query_timeout_seconds = query_timeout;
        }
        if self.skip_connection_check {
            config.pipeline.check_connection = false;
        }

        // 缓存配置
        if self.no_cache {
            config.cache.enabled = false;
        }
        if let Some(cache_dir) = self.cache_dir {
            config.cache.cache_dir = cache_dir;
        }

        if self.verbose {
            config.verbose = true;
        }

        config.validate()?;
        Ok(config)
    }
}

// Include tests
#[cfg(test)]
mod tests;
