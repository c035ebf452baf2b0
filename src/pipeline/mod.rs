//! 任务链：任务定义、执行、校验、重试与顶层工作流

pub mod context;
pub mod error;
pub mod retry;
pub mod task_manager;
pub mod tasks;
pub mod validator;
pub mod workflow;

pub use context::PipelineContext;
pub use error::PipelineError;
pub use task_manager::{RunState, TaskManager, TaskResult};
pub use workflow::{QueryOutcome, ResearchAssistant, RunMode, launch};
