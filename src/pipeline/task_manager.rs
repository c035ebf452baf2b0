//! 任务管理器 - 顺序执行任务链，负责重试、校验、阶段结果传递与进度展示

use chrono::{DateTime, Utc};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::llm::CompletionRequest;
use crate::memory::{COMPLETED_TASKS, Memory, STAGE_RESULTS};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::tasks::{StageKind, TaskSpec};
use crate::pipeline::validator::{OutputValidator, StageOutput, Validation};
use crate::utils::template;

/// 每个阶段进度条的总长度
pub const PROGRESS_TOTAL: u64 = 100;

/// 运行状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    /// 正在调用模型，`stage` 为任务在链中的下标
    Running { stage: usize },
    /// 正在校验输出
    Validating { stage: usize },
    Complete,
    Failed,
}

/// 单个阶段校验通过后的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub raw_output: String,
    pub valid: bool,
    pub output: StageOutput,
    /// 成功前用掉的尝试次数
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

/// 任务管理器，每个查询一个实例
pub struct TaskManager {
    context: PipelineContext,
    results: Memory,
    validator: OutputValidator,
    retry: RetryPolicy,
    progress: MultiProgress,
    task_progress: HashMap<String, ProgressBar>,
    state: RunState,
    run_id: Uuid,
}

impl TaskManager {
    pub fn new(context: PipelineContext) -> Self {
        Self::with_progress(context, MultiProgress::new())
    }

    /// 指定进度条的绘制目标，测试中可传入隐藏的 `MultiProgress`
    pub fn with_progress(context: PipelineContext, progress: MultiProgress) -> Self {
        let validator = OutputValidator::new(&context.config.writing);
        let retry = RetryPolicy::from_config(&context.config.pipeline);
        Self {
            context,
            results: Memory::new(),
            validator,
            retry,
            progress,
            task_progress: HashMap::new(),
            state: RunState::Pending,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// 为任务添加一个进度条
    pub fn add_progress_task(&mut self, task: &TaskSpec) -> ProgressBar {
        let bar = self.progress.add(ProgressBar::new(PROGRESS_TOTAL));
        let style = ProgressStyle::with_template("{msg:>12} [{bar:40.green/white}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(task.id.clone());
        self.task_progress.insert(task.id.clone(), bar.clone());
        bar
    }

    /// 推进进度条，没有对应进度条时忽略
    pub fn update_progress(&self, task_id: &str, advance: u64) {
        if let Some(bar) = self.task_progress.get(task_id) {
            bar.inc(advance);
        }
    }

    /// 当前进度
    pub fn progress_position(&self, task_id: &str) -> Option<u64> {
        self.task_progress.get(task_id).map(|bar| bar.position())
    }

    /// 详细模式下以对话形式展示请求与响应
    pub fn show_conversation(&self, role: &str, content: &str) {
        if !self.context.config.verbose {
            return;
        }
        let line = "─".repeat(60);
        let text = format!("💬 {}\n{}\n{}\n{}", role, line, content.trim(), line);
        // 进度条可见时通过MultiProgress输出，避免打乱进度条
        if self.progress.is_hidden() || self.progress.println(&text).is_err() {
            println!("{}", text);
        }
    }

    /// 执行调研阶段
    pub async fn execute_research_task(
        &mut self,
        index: usize,
        task: &TaskSpec,
        query: &str,
    ) -> Result<TaskResult, PipelineError> {
        let description = template::render(&task.description, &[("query", query)]);

        self.show_conversation("Research Request", &format!("Find information about: {}", query));
        let result = self.run_stage(index, task, query, &description).await?;
        self.show_conversation("Research Response", &result.raw_output);

        self.record_result(StageKind::Research.results_key(), &result);
        Ok(result)
    }

    /// 执行写作阶段，需要调研结果已经就绪
    pub async fn execute_writing_task(
        &mut self,
        index: usize,
        task: &TaskSpec,
        query: &str,
    ) -> Result<TaskResult, PipelineError> {
        let research_key = StageKind::Research.results_key();
        let Some(StageOutput::Research { findings, sources }) = self
            .results
            .get::<TaskResult>(STAGE_RESULTS, research_key)
            .map(|result| result.output)
        else {
            return Err(PipelineError::MissingDependency(research_key.to_string()));
        };

        let writing = &self.context.config.writing;
        let min_words = writing.min_words.to_string();
        let max_words = writing.max_words.to_string();
        let max_paragraphs = writing.max_paragraphs.to_string();
        let description = template::render(
            &task.description,
            &[
                ("query", query),
                ("findings", findings.as_str()),
                ("sources", sources.as_str()),
                ("min_words", min_words.as_str()),
                ("max_words", max_words.as_str()),
                ("max_paragraphs", max_paragraphs.as_str()),
            ],
        );

        self.show_conversation(
            "Writing Request",
            "Compose a response using the research findings",
        );
        let result = self.run_stage(index, task, query, &description).await?;
        self.show_conversation("Writing Response", &result.raw_output);

        self.record_result(StageKind::Writing.results_key(), &result);
        Ok(result)
    }

    /// 按顺序执行全部任务，返回按 `writing_format` 渲染的最终结果
    pub async fn execute_tasks(&mut self, query: &str) -> Result<String, PipelineError> {
        let tasks = self.context.config.tasks.clone();
        debug!(run_id = %self.run_id, stages = tasks.len(), "starting task chain");

        for task in &tasks {
            self.add_progress_task(task);
        }

        match self.execute_chain(&tasks, query).await {
            Ok(output) => {
                self.state = RunState::Complete;
                debug!(run_id = %self.run_id, "task chain complete");
                Ok(output)
            }
            Err(e) => {
                self.state = RunState::Failed;
                warn!(run_id = %self.run_id, error = %e, "task chain failed");
                self.show_conversation("Error", &e.to_string());
                Err(e)
            }
        }
    }

    async fn execute_chain(&mut self, tasks: &[TaskSpec], query: &str) -> Result<String, PipelineError> {
        let mut final_output = None;

        for (index, task) in tasks.iter().enumerate() {
            if let Some(missing) = task
                .dependencies
                .iter()
                .find(|dependency| !self.results.has_data(COMPLETED_TASKS, dependency))
            {
                return Err(PipelineError::MissingDependency(missing.clone()));
            }

            let result = match task.kind {
                StageKind::Research => self.execute_research_task(index, task, query).await?,
                StageKind::Writing => self.execute_writing_task(index, task, query).await?,
            };

            if let Err(e) = self.results.store(COMPLETED_TASKS, &task.id, true) {
                warn!(task = %task.id, error = %e, "failed to mark task as completed");
            }
            self.update_progress(&task.id, PROGRESS_TOTAL);

            if matches!(result.output, StageOutput::Writing { .. }) {
                final_output = Some(result.output);
            }
        }

        match final_output {
            Some(StageOutput::Writing {
                content, sources, ..
            }) => Ok(template::render(
                &self.context.config.messages.writing_format,
                &[("content", content.as_str()), ("sources", sources.as_str())],
            )),
            _ => Err(PipelineError::NoFinalOutput),
        }
    }

    /// 带重试地执行一个阶段：模型调用失败与校验失败都会重试
    async fn run_stage(
        &mut self,
        index: usize,
        task: &TaskSpec,
        query: &str,
        description: &str,
    ) -> Result<TaskResult, PipelineError> {
        let agent = self
            .context
            .registry
            .get(&task.agent)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownAgent(task.agent.clone()))?;

        let request = CompletionRequest {
            agent_id: agent.id.clone(),
            system_prompt: agent.system_prompt(query),
            user_prompt: format!(
                "{}\n\nExpected output: {}",
                description, task.expected_output
            ),
            use_tools: agent.has_tools(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt_stage(index, task, &request).await {
                Ok((raw_output, output)) => {
                    debug!(task = %task.id, attempt, "stage validated");
                    return Ok(TaskResult {
                        task_id: task.id.clone(),
                        raw_output,
                        valid: true,
                        output,
                        attempts: attempt,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        task = %task.id,
                        attempt,
                        max_retries = self.retry.max_retries,
                        error = %e,
                        "stage attempt failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(PipelineError::RetriesExhausted {
                        stage: task.id.clone(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_stage(
        &mut self,
        index: usize,
        task: &TaskSpec,
        request: &CompletionRequest,
    ) -> Result<(String, StageOutput), PipelineError> {
        self.state = RunState::Running { stage: index };
        let raw_output = self
            .context
            .completion
            .complete(request)
            .await
            .map_err(|e| PipelineError::Completion(format!("{:#}", e)))?;

        self.state = RunState::Validating { stage: index };
        match self.validator.validate(task.kind, &raw_output) {
            Validation::Valid(output) => Ok((raw_output, output)),
            Validation::Invalid { error } => Err(PipelineError::Validation(error)),
        }
    }

    fn record_result(&mut self, key: &str, result: &TaskResult) {
        if let Err(e) = self.results.store(STAGE_RESULTS, key, result) {
            warn!(task = %result.task_id, error = %e, "failed to store stage result");
        }
    }

    /// 已存储的阶段结果
    pub fn stage_result(&mut self, key: &str) -> Option<TaskResult> {
        self.results.get(STAGE_RESULTS, key)
    }

    /// 清理本次运行的结果与进度条，状态回到 `Pending`
    pub fn cleanup(&mut self) {
        let usage = self.results.metadata();
        debug!(
            run_id = %self.run_id,
            entries = usage.data_sizes.len(),
            bytes = usage.total_size,
            "releasing run results"
        );
        self.results.clear();
        for bar in self.task_progress.values() {
            bar.finish_and_clear();
        }
        self.task_progress.clear();
        let _ = self.progress.clear();
        self.state = RunState::Pending;
    }
}

#[cfg(test)]
mod tests;
