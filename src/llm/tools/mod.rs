//! 暴露给Agent的工具：网页搜索、网页抓取、引用格式化

use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;

use crate::config::ResearchConfig;

pub mod citation;
pub mod web_scraper;
pub mod web_search;

pub use citation::{Citation, CitationManagerTool, SourceRef};
pub use web_scraper::{ScrapedPage, WebScraperTool};
pub use web_search::{SearchResult, WebSearchTool};

/// 工具执行错误
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("html parsing failed: {0}")]
    Parse(String),
}

/// 一个Agent可挂载的全部工具
#[derive(Debug, Clone)]
pub struct AgentTools {
    pub web_search: WebSearchTool,
    pub web_scraper: WebScraperTool,
    pub citation_manager: CitationManagerTool,
}

impl AgentTools {
    pub fn new(config: &ResearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()
            .context("Failed to build HTTP client for agent tools")?;

        Ok(Self {
            web_search: WebSearchTool::new(http.clone(), config.max_sources),
            web_scraper: WebScraperTool::new(http, config.max_page_chars),
            citation_manager: CitationManagerTool::new(),
        })
    }
}

/// 合并连续空白，便于把HTML文本片段喂给模型
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
