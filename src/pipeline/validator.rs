//! 阶段输出校验器 - 只检查下游需要的最小结构约定

use serde::{Deserialize, Serialize};

use crate::config::WritingConfig;
use crate::pipeline::tasks::StageKind;

/// 调研输出中分隔发现与来源的标记
pub const RESEARCH_DELIMITER: &str = "##";
/// 写作输出中分隔正文与来源的标记
pub const WRITING_DELIMITER: &str = "---";

/// 校验通过后提取出的结构化字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    Research {
        findings: String,
        sources: String,
    },
    Writing {
        content: String,
        sources: String,
        word_count: usize,
    },
}

/// 校验结果
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(StageOutput),
    Invalid { error: String },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    fn invalid(error: impl Into<String>) -> Self {
        Validation::Invalid {
            error: error.into(),
        }
    }
}

/// 输出校验器，无副作用
#[derive(Debug, Clone)]
pub struct OutputValidator {
    min_words: usize,
    max_words: usize,
}

impl OutputValidator {
    pub fn new(writing: &WritingConfig) -> Self {
        Self {
            min_words: writing.min_words,
            max_words: writing.max_words,
        }
    }

    /// 按阶段类型分派
    pub fn validate(&self, kind: StageKind, output: &str) -> Validation {
        match kind {
            StageKind::Research => self.validate_research_output(output),
            StageKind::Writing => self.validate_writing_output(output),
        }
    }

    /// 以 `##` 切分：第一段为发现，第二段为来源，两者都不能为空
    pub fn validate_research_output(&self, output: &str) -> Validation {
        let (findings, sources) = split_sections(output, RESEARCH_DELIMITER);
        if findings.is_empty() || sources.is_empty() {
            return Validation::invalid("Missing required sections");
        }

        Validation::Valid(StageOutput::Research {
            findings: findings.to_string(),
            sources: sources.to_string(),
        })
    }

    /// 以 `---` 切分：第一段为正文，第二段为来源；正文字数必须落在闭区间内
    pub fn validate_writing_output(&self, output: &str) -> Validation {
        let (content, sources) = split_sections(output, WRITING_DELIMITER);
        let word_count = content.split_whitespace().count();
        if word_count < self.min_words || word_count > self.max_words {
            return Validation::invalid(format!(
                "Word count {} outside allowed range [{}, {}]",
                word_count, self.min_words, self.max_words
            ));
        }

        Validation::Valid(StageOutput::Writing {
            content: content.to_string(),
            sources: sources.to_string(),
            word_count,
        })
    }
}

/// 取分隔符前后的前两段并去除首尾空白
fn split_sections<'a>(output: &'a str, delimiter: &str) -> (&'a str, &'a str) {
    let mut sections = output.split(delimiter);
    let first = sections.next().unwrap_or_default().trim();
    let second = sections.next().unwrap_or_default().trim();
    (first, second)
}
