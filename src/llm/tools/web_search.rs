//! 网页搜索工具 - 基于DuckDuckGo的HTML接口

use rig::tool::Tool;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ToolError, collapse_whitespace};

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// 网页搜索工具
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    http: reqwest::Client,
    max_results: usize,
    endpoint: String,
}

/// 搜索参数
#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
    pub max_results: Option<usize>,
}

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl WebSearchTool {
    pub fn new(http: reqwest::Client, max_results: usize) -> Self {
        Self {
            http,
            max_results,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// 替换搜索接口地址
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ToolError> {
        let body = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_search_results(&body, max_results)
    }
}

/// 从DuckDuckGo的HTML结果页中提取结果
pub fn parse_search_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, ToolError> {
    let document = Html::parse_document(html);
    let result_selector = selector("div.result")?;
    let link_selector = selector("a.result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let mut results = Vec::new();
    for element in document.select(&result_selector) {
        if results.len() >= max_results {
            break;
        }

        let Some(link) = element.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_result_url(href) else {
            continue;
        };

        let title = collapse_whitespace(&link.text().collect::<String>());
        let snippet = element
            .select(&snippet_selector)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
    }

    Ok(results)
}

fn selector(css: &str) -> Result<Selector, ToolError> {
    Selector::parse(css).map_err(|e| ToolError::Parse(format!("selector '{}': {}", css, e)))
}

/// 结果链接可能是 `//duckduckgo.com/l/?uddg=<编码后的目标地址>` 形式的跳转
fn resolve_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
        return Url::parse(&target).ok().map(String::from);
    }

    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";

    type Error = ToolError;
    type Args = WebSearchArgs;
    type Output = Vec<SearchResult>;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web using DuckDuckGo. Returns a list of results with title, url and snippet.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return (default 5)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        println!("   🔧 tool called...web_search@{}", args.query);

        let max_results = args
            .max_results
            .unwrap_or(self.max_results)
            .clamp(1, self.max_results.max(1));

        // 搜索失败时返回空列表，让Agent自行决定下一步
        match self.search(&args.query, max_results).await {
            Ok(results) => {
                debug!(query = %args.query, count = results.len(), "web search finished");
                Ok(results)
            }
            Err(e) => {
                warn!(query = %args.query, error = %e, "web search failed");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r##"
<html><body>
  <div class="result results_links">
    <h2 class="result__title">
      <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn&amp;rut=abc">
        Learn   Rust
      </a>
    </h2>
    <a class="result__snippet" href="#">The <b>Rust</b> Programming Language book.</a>
  </div>
  <div class="result results_links">
    <a class="result__a" href="https://doc.rust-lang.org/std/">std - Rust</a>
  </div>
  <div class="result results_links">
    <span>no link here</span>
  </div>
  <div class="result results_links">
    <a class="result__a" href="https://crates.io/">crates.io</a>
    <div class="result__snippet">The Rust community's crate registry</div>
  </div>
</body></html>
"##;

    #[test]
    fn test_parse_search_results() {
        let results = parse_search_results(FIXTURE, 10).unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].title, "Learn Rust");
        assert_eq!(results[0].url, "https://www.rust-lang.org/learn");
        assert_eq!(results[0].snippet, "The Rust Programming Language book.");

        assert_eq!(results[1].url, "https://doc.rust-lang.org/std/");
        assert!(results[1].snippet.is_empty());

        assert_eq!(results[2].title, "crates.io");
    }

    #[test]
    fn test_parse_search_results_respects_limit() {
        let results = parse_search_results(FIXTURE, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Learn Rust");
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_search_results("<html></html>", 5).unwrap().is_empty());
    }

    /// 在本地端口上返回一次固定HTML的HTTP服务
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/html/", addr)
    }

    #[tokio::test]
    async fn test_call_against_local_endpoint() {
        let endpoint = serve_once(FIXTURE).await;
        let tool = WebSearchTool::new(reqwest::Client::new(), 2).with_endpoint(endpoint);

        let results = tool
            .call(WebSearchArgs {
                query: "rust".to_string(),
                max_results: Some(10),
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://www.rust-lang.org/learn");
    }

    #[tokio::test]
    async fn test_call_returns_empty_list_when_search_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/html/", listener.local_addr().unwrap());
        drop(listener);

        let tool = WebSearchTool::new(reqwest::Client::new(), 5).with_endpoint(endpoint);
        let results = tool
            .call(WebSearchArgs {
                query: "rust".to_string(),
                max_results: None,
            })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_resolve_result_url() {
        assert_eq!(
            resolve_result_url("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1"),
            Some("https://example.com/a?b=1".to_string())
        );
        assert_eq!(
            resolve_result_url("https://example.com/"),
            Some("https://example.com/".to_string())
        );
        assert_eq!(resolve_result_url("javascript:void(0)"), None);
        assert_eq!(resolve_result_url("/relative"), None);
    }
}
