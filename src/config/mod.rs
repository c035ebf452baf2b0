use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::agents::{AgentSpec, KNOWN_TOOLS};
use crate::pipeline::tasks::{StageKind, TaskSpec};
use crate::utils::template;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "llama-search.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "ollama")]
    #[default]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// LLM模型配置
    pub llm: LLMConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 任务链执行配置
    pub pipeline: PipelineConfig,

    /// 调研阶段配置
    pub research: ResearchConfig,

    /// 写作阶段配置
    pub writing: WritingConfig,

    /// 面向用户的消息模板
    pub messages: MessagesConfig,

    /// Agent角色定义
    pub agents: Vec<AgentSpec>,

    /// 任务链定义，按执行顺序排列
    pub tasks: Vec<TaskSpec>,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 带工具的Agent最多进行的对话轮数
    pub max_tool_turns: usize,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存有效期（秒）
    pub ttl_seconds: u64,

    /// 缓存目录大小上限（字节），仅在清理时生效
    pub max_size_bytes: u64,
}

/// 任务链执行配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 每个阶段的最大尝试次数
    pub max_retries: u32,

    /// 重试基础间隔（毫秒），第n次失败后等待 base * n
    pub retry_base_delay_ms: u64,

    /// 整个查询的超时时间（秒）
    pub query_timeout_seconds: u64,

    /// 查询最大长度（字符）
    pub max_query_length: usize,

    /// 启动时检查模型连接
    pub check_connection: bool,
}

/// 调研阶段配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ResearchConfig {
    /// 搜索工具返回的最大结果数
    pub max_sources: usize,

    /// 抓取网页时的超时时间（秒）
    pub fetch_timeout_seconds: u64,

    /// 抓取正文保留的最大字符数
    pub max_page_chars: usize,

    /// 搜索与抓取请求使用的User-Agent
    pub user_agent: String,
}

/// 写作阶段配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WritingConfig {
    pub min_words: usize,
    pub max_words: usize,
    pub max_paragraphs: usize,
}

/// 面向用户的消息模板，占位符形如 `{name}`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MessagesConfig {
    /// 最终输出模板，需要 `{content}` 与 `{sources}`
    pub writing_format: String,

    /// 任务失败，需要 `{detail}`，可选 `{attempts}` `{max_retries}`
    pub task_failed: String,

    /// 查询超时
    pub timeout: String,

    /// 查询非法，可选 `{max}`
    pub invalid_query: String,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config
            .validate()
            .context(format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    /// 校验Agent、任务链与消息模板，在启动时而不是调用时发现问题
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_retries == 0 {
            bail!("pipeline.max_retries must be at least 1");
        }
        if self.writing.min_words > self.writing.max_words {
            bail!(
                "writing.min_words ({}) is greater than writing.max_words ({})",
                self.writing.min_words,
                self.writing.max_words
            );
        }

        for agent in &self.agents {
            for tool in &agent.tools {
                if !KNOWN_TOOLS.contains(&tool.as_str()) {
                    bail!("agent '{}' references unknown tool '{}'", agent.id, tool);
                }
            }
        }

        TaskSpec::validate_chain(&self.tasks, &self.agents)?;

        for task in &self.tasks {
            let required: &[&str] = match task.kind {
                StageKind::Research => &["query"],
                StageKind::Writing => &["findings"],
            };
            let missing = template::missing_placeholders(&task.description, required);
            if !missing.is_empty() {
                bail!(
                    "task '{}' description is missing placeholders: {}",
                    task.id,
                    missing.join(", ")
                );
            }
        }

        let message_checks: [(&str, &str, &[&str]); 2] = [
            (
                "messages.writing_format",
                &self.messages.writing_format,
                &["content", "sources"],
            ),
            ("messages.task_failed", &self.messages.task_failed, &["detail"]),
        ];
        for (name, value, required) in message_checks {
            let missing = template::missing_placeholders(value, required);
            if !missing.is_empty() {
                bail!("{} is missing placeholders: {}", name, missing.join(", "));
            }
        }

        Ok(())
    }

    /// 查找默认位置的配置文件
    pub fn default_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            cache: CacheConfig::default(),
            pipeline: PipelineConfig::default(),
            research: ResearchConfig::default(),
            writing: WritingConfig::default(),
            messages: MessagesConfig::default(),
            agents: crate::agents::default_agents(),
            tasks: crate::pipeline::tasks::default_tasks(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_base_url: String::from("http://localhost:11434"),
            model: String::from("llama3.1"),
            max_tokens: 4096,
            temperature: 0.3,
            timeout_seconds: 300,
            max_tool_turns: 8,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".llama-search/cache"),
            ttl_seconds: 3600,
            max_size_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
            query_timeout_seconds: 600,
            max_query_length: 500,
            check_connection: true,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_sources: 5,
            fetch_timeout_seconds: 10,
            max_page_chars: 20_000,
            user_agent: String::from("Mozilla/5.0 (compatible; LlamaSearch/1.0)"),
        }
    }
}

impl Default for WritingConfig {
    fn default() -> Self {
        Self {
            min_words: 100,
            max_words: 500,
            max_paragraphs: 3,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            writing_format: String::from("{content}\n\n---\nSources:\n{sources}\n"),
            task_failed: String::from("Task failed: {detail} ({attempts}/{max_retries})"),
            timeout: String::from("The operation timed out. Please try again."),
            invalid_query: String::from("Please enter a valid query (max {max} characters)."),
        }
    }
}
