//! 引用管理工具

use chrono::Local;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ToolError;

/// 引用日期的默认格式，例如 `2024, March 05`
const DATE_FORMAT: &str = "%Y, %B %d";

/// 一条来源信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// 格式化后的引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 完整引用
    pub citation: String,
    /// 行内引用
    pub inline: String,
}

/// 格式化单条来源。作者缺省为URL的主机名，日期缺省为 `today`
pub fn format_citation(source: &SourceRef, today: &str) -> Citation {
    let author = source
        .author
        .clone()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| host_of(&source.url));
    let date = source
        .date
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| today.to_string());

    Citation {
        citation: format!(
            "{} ({}). {}. Retrieved from {}",
            author, date, source.title, source.url
        ),
        inline: format!("({}, {})", author, date),
    }
}

/// 生成参考文献列表
pub fn format_bibliography(sources: &[SourceRef], today: &str) -> String {
    let citations = sources
        .iter()
        .map(|s| format_citation(s, today).citation)
        .collect::<Vec<_>>();
    format!("\n\nReferences\n{}", citations.join("\n\n"))
}

/// 当天日期，按引用格式输出
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_default()
}

/// 引用管理工具
#[derive(Debug, Clone, Default)]
pub struct CitationManagerTool;

impl CitationManagerTool {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
pub struct CitationArgs {
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Serialize)]
pub struct CitationOutput {
    pub citations: Vec<Citation>,
    pub bibliography: String,
}

impl Tool for CitationManagerTool {
    const NAME: &'static str = "citation_manager";

    type Error = ToolError;
    type Args = CitationArgs;
    type Output = CitationOutput;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Format source citations. Returns a full and an inline citation for each source plus a bibliography.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "sources": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string", "description": "Page title" },
                                "url": { "type": "string", "description": "Source URL" },
                                "author": { "type": "string", "description": "Author name (optional)" },
                                "date": { "type": "string", "description": "Publication date (optional)" }
                            },
                            "required": ["title", "url"]
                        }
                    }
                },
                "required": ["sources"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        println!(
            "   🔧 tool called...citation_manager@{} sources",
            args.sources.len()
        );

        let today = today();
        Ok(CitationOutput {
            citations: args
                .sources
                .iter()
                .map(|s| format_citation(s, &today))
                .collect(),
            bibliography: format_bibliography(&args.sources, &today),
        })
    }
}
