use thiserror::Error;

/// 任务链执行过程中的错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 模型调用失败（网络、超时、服务端错误），可重试
    #[error("completion failed: {0}")]
    Completion(String),

    /// 阶段输出不符合结构约定，按瞬时错误处理并重试
    #[error("Invalid output format: {0}")]
    Validation(String),

    /// 下游阶段缺少上游结果，属于逻辑错误，不重试
    #[error("No {0} results available")]
    MissingDependency(String),

    /// 重试次数耗尽
    #[error("stage '{stage}' failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        stage: String,
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("invalid task chain: {0}")]
    InvalidTaskChain(String),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("the task chain produced no writing result")]
    NoFinalOutput,
}

impl PipelineError {
    /// 是否值得重新执行该阶段
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Completion(_) | PipelineError::Validation(_)
        )
    }

    /// 实际尝试的次数，未进入重试的错误记为0
    pub fn attempts(&self) -> u32 {
        match self {
            PipelineError::RetriesExhausted { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// 面向用户的错误详情：重试耗尽时展示最后一次失败的原因
    pub fn detail(&self) -> String {
        match self {
            PipelineError::RetriesExhausted { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_research_message() {
        let err = PipelineError::MissingDependency("research".to_string());
        assert_eq!(err.to_string(), "No research results available");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(PipelineError::Completion("timeout".into()).is_retryable());
        assert!(PipelineError::Validation("Missing required sections".into()).is_retryable());
        assert!(!PipelineError::NoFinalOutput.is_retryable());
        assert!(!PipelineError::UnknownAgent("x".into()).is_retryable());
    }

    #[test]
    fn test_retries_exhausted_detail_and_attempts() {
        let err = PipelineError::RetriesExhausted {
            stage: "research".to_string(),
            attempts: 3,
            source: Box::new(PipelineError::Validation(
                "Missing required sections".to_string(),
            )),
        };
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.detail(), "Invalid output format: Missing required sections");
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
