use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::client::LLMClient;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::task_manager::TaskManager;
use crate::utils::query::sanitize_query;
use crate::utils::template;

/// 交互模式下的退出指令
pub const EXIT_COMMAND: &str = "exit";

/// 程序的运行方式
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    /// 处理单个查询后退出
    Single(String),
    /// 从标准输入逐行读取查询
    Interactive,
    /// 清理缓存目录后退出
    PruneCache,
}

/// 一次查询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// 命中缓存
    Cached(String),
    /// 任务链执行成功
    Completed(String),
    /// 任务链失败或超时，内容为渲染好的错误消息
    Failed(String),
    /// 查询为空
    Rejected(String),
}

impl QueryOutcome {
    pub fn message(&self) -> &str {
        match self {
            QueryOutcome::Cached(text)
            | QueryOutcome::Completed(text)
            | QueryOutcome::Failed(text)
            | QueryOutcome::Rejected(text) => text,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Cached(_) | QueryOutcome::Completed(_))
    }
}

/// 调研助手：把查询串起 清理 -> 缓存 -> 任务链 -> 缓存写入
pub struct ResearchAssistant {
    context: PipelineContext,
    show_progress: bool,
}

impl ResearchAssistant {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            context,
            show_progress: true,
        }
    }

    /// 不绘制进度条
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// 处理一个查询
    pub async fn process_query(&self, query: &str) -> QueryOutcome {
        let config = &self.context.config;
        let max_length = config.pipeline.max_query_length;

        let query = sanitize_query(query, max_length);
        if query.is_empty() {
            let max = max_length.to_string();
            return QueryOutcome::Rejected(template::render(
                &config.messages.invalid_query,
                &[("max", max.as_str())],
            ));
        }

        if let Some(cached) = self.context.cache_manager.lookup(&query).await {
            println!("💾 Using cached result");
            return QueryOutcome::Cached(cached);
        }

        let progress = if self.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let mut manager = TaskManager::with_progress(self.context.clone(), progress);

        let run_id = manager.run_id();
        println!("🔍 Researching: {}", query);
        let started = Instant::now();
        let timeout = Duration::from_secs(config.pipeline.query_timeout_seconds);

        let outcome = match tokio::time::timeout(timeout, manager.execute_tasks(&query)).await {
            Ok(Ok(result)) => {
                self.context.cache_manager.store(&query, &result).await;
                println!("✅ Done in {:.1}s", started.elapsed().as_secs_f64());
                QueryOutcome::Completed(result)
            }
            Ok(Err(e)) => QueryOutcome::Failed(self.render_failure(&e)),
            Err(_) => {
                warn!(
                    run_id = %run_id,
                    timeout_seconds = config.pipeline.query_timeout_seconds,
                    "query timed out"
                );
                QueryOutcome::Failed(config.messages.timeout.clone())
            }
        };

        manager.cleanup();
        outcome
    }

    /// 按 `task_failed` 模板渲染错误
    pub fn render_failure(&self, error: &PipelineError) -> String {
        let config = &self.context.config;
        let detail = error.detail();
        let attempts = error.attempts().to_string();
        let max_retries = config.pipeline.max_retries.to_string();
        template::render(
            &config.messages.task_failed,
            &[
                ("detail", detail.as_str()),
                ("attempts", attempts.as_str()),
                ("max_retries", max_retries.as_str()),
            ],
        )
    }

    /// 单次查询模式：处理并输出结果，返回结果供调用方决定退出码
    pub async fn run_single(&self, query: &str) -> QueryOutcome {
        let outcome = self.process_query(query).await;
        print_outcome(&outcome);
        outcome
    }

    /// 交互模式：逐行读取查询直到输入 `exit` 或输入结束，返回处理的查询数
    pub async fn run_interactive<R>(&self, input: R) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("🦙 llama-search interactive mode. Type '{}' to quit.", EXIT_COMMAND);

        let mut lines = input.lines();
        let mut processed = 0;
        loop {
            print!("\n❓ Query: ");
            std::io::stdout().flush().context("Failed to flush stdout")?;

            let Some(line) = lines.next_line().await.context("Failed to read query")? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case(EXIT_COMMAND) {
                break;
            }

            let outcome = self.process_query(line).await;
            print_outcome(&outcome);
            processed += 1;
        }

        if self.context.config.verbose {
            info!(
                "cache performance: {}",
                self.context.cache_manager.generate_performance_report()
            );
        }
        println!("👋 Goodbye!");
        Ok(processed)
    }
}

/// 输出查询结果
pub fn print_outcome(outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Cached(text) | QueryOutcome::Completed(text) => {
            println!("\n📝 Result:\n{}", text)
        }
        QueryOutcome::Failed(text) => eprintln!("❌ {}", text),
        QueryOutcome::Rejected(text) => eprintln!("⚠️ {}", text),
    }
}

/// 启动调研助手，查询失败或被拒绝时返回失败退出码
pub async fn launch(config: &Config, mode: RunMode) -> Result<ExitCode> {
    if mode == RunMode::PruneCache {
        let cache = crate::cache::CacheManager::new(config.cache.clone());
        let report = cache.prune().await;
        println!(
            "🧹 Pruned {} cache entries ({} expired, {} invalid, {} over size limit), {} bytes remaining",
            report.removed(),
            report.removed_expired,
            report.removed_invalid,
            report.removed_for_size,
            report.remaining_bytes
        );
        return Ok(ExitCode::SUCCESS);
    }

    let llm_client = LLMClient::new(config)?;

    // 启动时检查模型连接
    if config.pipeline.check_connection {
        llm_client.check_connection().await?;
    }

    let context = PipelineContext::with_completion(config.clone(), Arc::new(llm_client));
    let assistant = ResearchAssistant::new(context);

    match mode {
        RunMode::Single(query) => {
            if !assistant.run_single(&query).await.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        RunMode::Interactive => {
            assistant
                .run_interactive(BufReader::new(tokio::io::stdin()))
                .await?;
        }
        RunMode::PruneCache => {}
    }

    Ok(ExitCode::SUCCESS)
}
