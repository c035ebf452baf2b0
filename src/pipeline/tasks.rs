//! 任务链定义：阶段类型、任务描述模板与依赖关系

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::agents::AgentSpec;
use crate::pipeline::error::PipelineError;

/// 阶段类型，决定使用哪条校验规则以及结果的存放位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Research,
    Writing,
}

impl StageKind {
    /// 阶段结果在结果缓存中的键
    pub fn results_key(&self) -> &'static str {
        match self {
            StageKind::Research => "research",
            StageKind::Writing => "writing",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.results_key())
    }
}

/// 单个阶段的定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub kind: StageKind,
    /// 执行该阶段的Agent id
    pub agent: String,
    /// 描述模板：调研阶段需要 `{query}`，写作阶段需要 `{findings}`
    pub description: String,
    pub expected_output: String,
    /// 依赖的前序任务id
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TaskSpec {
    /// 校验任务链：id唯一、Agent存在、依赖只指向更早的任务、以写作阶段结尾
    pub fn validate_chain(tasks: &[TaskSpec], agents: &[AgentSpec]) -> Result<(), PipelineError> {
        let Some(last) = tasks.last() else {
            return Err(PipelineError::InvalidTaskChain(
                "the task list is empty".to_string(),
            ));
        };
        if last.kind != StageKind::Writing {
            return Err(PipelineError::InvalidTaskChain(format!(
                "the last task '{}' must be a writing stage",
                last.id
            )));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for task in tasks {
            if !agents.iter().any(|agent| agent.id == task.agent) {
                return Err(PipelineError::UnknownAgent(task.agent.clone()));
            }
            for dependency in &task.dependencies {
                if !seen.contains(dependency.as_str()) {
                    return Err(PipelineError::InvalidTaskChain(format!(
                        "task '{}' depends on '{}', which is not defined before it",
                        task.id, dependency
                    )));
                }
            }
            if !seen.insert(task.id.as_str()) {
                return Err(PipelineError::InvalidTaskChain(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
        }

        Ok(())
    }
}

/// 内置任务链：调研 -> 写作
pub fn default_tasks() -> Vec<TaskSpec> {
    vec![
        TaskSpec {
            id: "research".to_string(),
            kind: StageKind::Research,
            agent: "researcher".to_string(),
            description: "Research the following question thoroughly: {query}\n\n\
                          Search the web for current, reliable information and read the most \
                          relevant pages. Write your findings first. Then put a line that \
                          contains only `##`, and after it list every source you used with \
                          its title and URL."
                .to_string(),
            expected_output: "Key findings, a `##` separator line, then a list of sources \
                              (title and URL)."
                .to_string(),
            dependencies: vec![],
        },
        TaskSpec {
            id: "writing".to_string(),
            kind: StageKind::Writing,
            agent: "writer".to_string(),
            description: "Write a clear answer to the question: {query}\n\n\
                          Base the answer only on these research findings:\n{findings}\n\n\
                          Sources:\n{sources}\n\n\
                          Use between {min_words} and {max_words} words in at most \
                          {max_paragraphs} paragraphs. After the answer put a line that \
                          contains only `---`, followed by the formatted citations."
                .to_string(),
            expected_output: "The answer text, a `---` separator line, then the citations."
                .to_string(),
            dependencies: vec!["research".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::default_agents;

    #[test]
    fn test_default_chain_is_valid() {
        assert!(TaskSpec::validate_chain(&default_tasks(), &default_agents()).is_ok());
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let err = TaskSpec::validate_chain(&[], &default_agents()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTaskChain(_)));
    }

    #[test]
    fn test_forward_dependency_is_rejected() {
        let mut tasks = default_tasks();
        tasks[0].dependencies = vec!["writing".to_string()];

        let err = TaskSpec::validate_chain(&tasks, &default_agents()).unwrap_err();
        assert!(err.to_string().contains("depends on 'writing'"));
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let mut tasks = default_tasks();
        tasks[1].dependencies = vec!["writing".to_string()];

        assert!(TaskSpec::validate_chain(&tasks, &default_agents()).is_err());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut tasks = default_tasks();
        tasks[1].id = "research".to_string();
        tasks[1].dependencies.clear();

        let err = TaskSpec::validate_chain(&tasks, &default_agents()).unwrap_err();
        assert!(err.to_string().contains("duplicate task id"));
    }

    #[test]
    fn test_chain_must_end_with_writing() {
        let tasks = vec![default_tasks().remove(0)];
        let err = TaskSpec::validate_chain(&tasks, &default_agents()).unwrap_err();
        assert!(err.to_string().contains("must be a writing stage"));
    }

    #[test]
    fn test_unknown_agent_is_rejected() {
        let mut tasks = default_tasks();
        tasks[0].agent = "ghost".to_string();

        let err = TaskSpec::validate_chain(&tasks, &default_agents()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownAgent(ref id) if id == "ghost"));
    }

    #[test]
    fn test_stage_kind_serde() {
        let task: TaskSpec = toml::from_str(
            r#"
id = "draft"
kind = "writing"
agent = "writer"
description = "Use {findings}"
expected_output = "text"
"#,
        )
        .unwrap();
        assert_eq!(task.kind, StageKind::Writing);
        assert!(task.dependencies.is_empty());
    }
}
