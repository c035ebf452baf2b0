//! 网页抓取工具 - 提取页面标题与正文段落

use chrono::Utc;
use rig::tool::Tool;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use super::{ToolError, collapse_whitespace};

/// 网页抓取工具
#[derive(Debug, Clone)]
pub struct WebScraperTool {
    http: reqwest::Client,
    max_chars: usize,
}

/// 抓取参数
#[derive(Debug, Deserialize)]
pub struct WebScraperArgs {
    pub url: String,
}

/// 页面元信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub fetched_at: String,
}

/// 抓取结果，失败时 `error` 有值且标题与正文为空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub title: String,
    pub text: String,
    pub metadata: PageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebScraperTool {
    pub fn new(http: reqwest::Client, max_chars: usize) -> Self {
        Self { http, max_chars }
    }

    async fn fetch(&self, raw_url: &str) -> Result<ScrapedPage, ToolError> {
        let url = Url::parse(raw_url).map_err(|e| ToolError::InvalidUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ToolError::InvalidUrl {
                url: raw_url.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let response = self.http.get(url.clone()).send().await?.error_for_status()?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        let (title, text) = parse_page(&body, self.max_chars)?;
        Ok(ScrapedPage {
            title,
            text,
            metadata: PageMetadata {
                url: url.to_string(),
                status: Some(status),
                content_type,
                fetched_at: Utc::now().to_rfc3339(),
            },
            error: None,
        })
    }
}

/// 提取 `<title>` 与全部 `<p>` 段落文本，正文按字符数截断
pub fn parse_page(html: &str, max_chars: usize) -> Result<(String, String), ToolError> {
    let document = Html::parse_document(html);
    let title_selector =
        Selector::parse("title").map_err(|e| ToolError::Parse(e.to_string()))?;
    let paragraph_selector = Selector::parse("p").map_err(|e| ToolError::Parse(e.to_string()))?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let text = document
        .select(&paragraph_selector)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok((title, text.chars().take(max_chars).collect()))
}

impl Tool for WebScraperTool {
    const NAME: &'static str = "web_scraper";

    type Error = ToolError;
    type Args = WebScraperArgs;
    type Output = ScrapedPage;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Download a web page and extract its title and main text content."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The absolute http(s) URL to scrape"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        println!("   🔧 tool called...web_scraper@{}", args.url);

        match self.fetch(&args.url).await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!(url = %args.url, error = %e, "web scraping failed");
                Ok(ScrapedPage {
                    metadata: PageMetadata {
                        url: args.url,
                        fetched_at: Utc::now().to_rfc3339(),
                        ..PageMetadata::default()
                    },
                    error: Some(e.to_string()),
                    ..ScrapedPage::default()
                })
            }
        }
    }
}
