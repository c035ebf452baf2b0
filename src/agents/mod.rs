//! Agent注册表 - 启动时由配置构建的角色定义集合

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::utils::template;

pub const TOOL_WEB_SEARCH: &str = "web_search";
pub const TOOL_WEB_SCRAPER: &str = "web_scraper";
pub const TOOL_CITATION_MANAGER: &str = "citation_manager";

/// 可以分配给Agent的工具名称
pub const KNOWN_TOOLS: &[&str] = &[TOOL_WEB_SEARCH, TOOL_WEB_SCRAPER, TOOL_CITATION_MANAGER];

/// 角色定义，构建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    /// 角色名，可包含 `{query}` 占位符
    pub role: String,
    /// 目标，可包含 `{query}` 占位符
    pub goal: String,
    /// 背景设定，可包含 `{query}` 占位符
    pub backstory: String,
    /// 可用工具
    #[serde(default)]
    pub tools: BTreeSet<String>,
}

impl AgentSpec {
    /// 针对具体查询渲染系统提示词
    pub fn system_prompt(&self, query: &str) -> String {
        let vars = [("query", query)];
        format!(
            "You are {}.\n\nYour goal: {}\n\n{}",
            template::render(&self.role, &vars),
            template::render(&self.goal, &vars),
            template::render(&self.backstory, &vars)
        )
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// Agent注册表
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentSpec>,
}

impl AgentRegistry {
    pub fn new(agents: &[AgentSpec]) -> Self {
        Self {
            agents: agents
                .iter()
                .map(|agent| (agent.id.clone(), agent.clone()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&AgentSpec> {
        self.agents.get(id)
    }
}

/// 内置的两个角色：调研员与写作者
pub fn default_agents() -> Vec<AgentSpec> {
    vec![
        AgentSpec {
            id: "researcher".to_string(),
            role: "Research Specialist".to_string(),
            goal: "Find accurate, current and well-sourced information about: {query}"
                .to_string(),
            backstory: "You are an experienced researcher who searches the web, reads the \
                        most relevant pages and separates verified facts from speculation. \
                        You always keep track of where each finding came from."
                .to_string(),
            tools: [TOOL_WEB_SEARCH, TOOL_WEB_SCRAPER]
                .into_iter()
                .map(String::from)
                .collect(),
        },
        AgentSpec {
            id: "writer".to_string(),
            role: "Technical Writer".to_string(),
            goal: "Turn research findings into a clear, well-structured answer".to_string(),
            backstory: "You are a skilled technical writer who synthesizes findings into \
                        concise prose and cites every source properly."
                .to_string(),
            tools: [TOOL_CITATION_MANAGER]
                .into_iter()
                .map(String::from)
                .collect(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = AgentRegistry::new(&default_agents());
        assert_eq!(registry.get("researcher").unwrap().role, "Research Specialist");
        assert_eq!(registry.get("writer").unwrap().role, "Technical Writer");
        assert!(registry.get("synthesizer").is_none());
    }

    #[test]
    fn test_system_prompt_renders_query() {
        let registry = AgentRegistry::new(&default_agents());
        let researcher = registry.get("researcher").unwrap();
        let prompt = researcher.system_prompt("tokio internals");

        assert!(prompt.starts_with("You are Research Specialist."));
        assert!(prompt.contains("information about: tokio internals"));
        assert!(!prompt.contains("{query}"));
    }

    #[test]
    fn test_default_agent_tools_are_known() {
        for agent in default_agents() {
            assert!(agent.has_tools());
            for tool in &agent.tools {
                assert!(KNOWN_TOOLS.contains(&tool.as_str()), "unknown tool {}", tool);
            }
        }
    }

    #[test]
    fn test_agent_spec_from_toml_without_tools() {
        let agent: AgentSpec = toml::from_str(
            r#"
id = "analyst"
role = "Query Analyzer"
goal = "Break down {query}"
backstory = "Expert in query analysis."
"#,
        )
        .unwrap();
        assert_eq!(agent.id, "analyst");
        assert!(!agent.has_tools());
    }
}
