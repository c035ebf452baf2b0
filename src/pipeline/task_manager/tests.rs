use super::*;
use crate::config::Config;
use crate::llm::CompletionService;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indicatif::ProgressDrawTarget;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// 按脚本依次返回响应的假模型
struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    fn new(responses: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(String::from).map_err(String::from))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(error)) => Err(anyhow!(error)),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

const RESEARCH_OK: &str = "Rust is a systems language.\n##\nhttps://www.rust-lang.org";
const WRITING_OK: &str = "Rust is a fast and safe language.\n---\n[1] rust-lang.org";

fn test_config() -> Config {
    let mut config = Config::default();
    config.writing.min_words = 1;
    config.writing.max_words = 50;
    config.pipeline.max_retries = 3;
    config.pipeline.retry_base_delay_ms = 0;
    config
}

fn manager(config: Config, completion: Arc<ScriptedCompletion>) -> TaskManager {
    let context = PipelineContext::with_completion(config, completion);
    TaskManager::with_progress(
        context,
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
    )
}

#[tokio::test]
async fn test_successful_chain() {
    let completion = ScriptedCompletion::new(vec![Ok(RESEARCH_OK), Ok(WRITING_OK)]);
    let mut manager = manager(test_config(), completion.clone());

    let output = manager.execute_tasks("what is rust").await.unwrap();
    assert_eq!(
        output,
        "Rust is a fast and safe language.\n\n---\nSources:\n[1] rust-lang.org\n"
    );
    assert_eq!(manager.state(), &RunState::Complete);
    assert_eq!(completion.calls(), 2);
    assert_eq!(manager.progress_position("research"), Some(PROGRESS_TOTAL));
    assert_eq!(manager.progress_position("writing"), Some(PROGRESS_TOTAL));

    let research = manager.stage_result("research").unwrap();
    assert!(research.valid);
    assert_eq!(research.attempts, 1);
}

#[tokio::test]
async fn test_requests_carry_query_and_findings() {
    let completion = ScriptedCompletion::new(vec![Ok(RESEARCH_OK), Ok(WRITING_OK)]);
    let mut manager = manager(test_config(), completion.clone());
    manager.execute_tasks("what is rust").await.unwrap();

    let research = completion.request(0);
    assert_eq!(research.agent_id, "researcher");
    assert!(research.use_tools);
    assert!(research.user_prompt.contains("what is rust"));
    assert!(research.system_prompt.starts_with("You are Research Specialist."));

    let writing = completion.request(1);
    assert_eq!(writing.agent_id, "writer");
    assert!(writing.user_prompt.contains("Rust is a systems language."));
    assert!(writing.user_prompt.contains("https://www.rust-lang.org"));
    assert!(writing.user_prompt.contains("between 1 and 50 words"));
}

#[tokio::test]
async fn test_placeholders_in_model_output_and_query_are_kept() {
    let completion = ScriptedCompletion::new(vec![
        Ok(RESEARCH_OK),
        Ok("Use the {sources} placeholder syntax.\n---\n[1] rust-lang.org"),
    ]);
    let mut manager = manager(test_config(), completion.clone());

    let output = manager.execute_tasks("what is {findings}").await.unwrap();
    assert_eq!(
        output,
        "Use the {sources} placeholder syntax.\n\n---\nSources:\n[1] rust-lang.org\n"
    );

    let writing = completion.request(1);
    assert!(
        writing
            .user_prompt
            .starts_with("Write a clear answer to the question: what is {findings}\n")
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_linear_backoff() {
    let mut config = test_config();
    config.pipeline.retry_base_delay_ms = 100;
    let completion = ScriptedCompletion::new(vec![
        Err("timeout"),
        Err("timeout"),
        Ok(RESEARCH_OK),
        Ok(WRITING_OK),
    ]);
    let mut manager = manager(config, completion.clone());

    let started = tokio::time::Instant::now();
    manager.execute_tasks("q").await.unwrap();

    // 100ms * 1 + 100ms * 2
    assert_eq!(started.elapsed(), std::time::Duration::from_millis(300));
    assert_eq!(manager.stage_result("research").unwrap().attempts, 3);
}

#[tokio::test]
async fn test_retry_then_success() {
    let completion = ScriptedCompletion::new(vec![
        Err("connection reset"),
        Ok("findings without any delimiter"),
        Ok(RESEARCH_OK),
        Ok(WRITING_OK),
    ]);
    let mut manager = manager(test_config(), completion.clone());

    assert!(manager.execute_tasks("q").await.is_ok());
    assert_eq!(completion.calls(), 4);
    assert_eq!(manager.stage_result("research").unwrap().attempts, 3);
    assert_eq!(manager.stage_result("writing").unwrap().attempts, 1);
}

#[tokio::test]
async fn test_always_failing_stage_exhausts_retries() {
    let completion = ScriptedCompletion::new(vec![Err("boom"), Err("boom"), Err("boom")]);
    let mut manager = manager(test_config(), completion.clone());

    let err = manager.execute_tasks("q").await.unwrap_err();
    assert_eq!(completion.calls(), 3);
    assert_eq!(err.attempts(), 3);
    assert_eq!(err.detail(), "completion failed: boom");
    assert!(matches!(
        err,
        PipelineError::RetriesExhausted { ref stage, .. } if stage == "research"
    ));
    assert_eq!(manager.state(), &RunState::Failed);
    assert_eq!(manager.progress_position("writing"), Some(0));
}

#[tokio::test]
async fn test_invalid_writing_output_is_retried() {
    let mut config = test_config();
    config.writing.min_words = 5;
    let completion = ScriptedCompletion::new(vec![
        Ok(RESEARCH_OK),
        Ok("Too short."),
        Ok("Too short."),
        Ok("Too short."),
    ]);
    let mut manager = manager(config, completion.clone());

    let err = manager.execute_tasks("q").await.unwrap_err();
    assert_eq!(completion.calls(), 4);
    assert_eq!(
        err.detail(),
        "Invalid output format: Word count 2 outside allowed range [5, 50]"
    );
}

#[tokio::test]
async fn test_writing_without_research_fails_fast() {
    let config = test_config();
    let writing = config.tasks[1].clone();
    let completion = ScriptedCompletion::new(vec![Ok(WRITING_OK)]);
    let mut manager = manager(config, completion.clone());

    let err = manager
        .execute_writing_task(1, &writing, "q")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No research results available");
    assert!(!err.is_retryable());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_unmet_dependency_fails_before_any_call() {
    let mut config = test_config();
    config.tasks.swap(0, 1);
    let completion = ScriptedCompletion::new(vec![Ok(WRITING_OK)]);
    let mut manager = manager(config, completion.clone());

    let err = manager.execute_tasks("q").await.unwrap_err();
    assert_eq!(err.to_string(), "No research results available");
    assert_eq!(completion.calls(), 0);
    assert_eq!(manager.state(), &RunState::Failed);
}

#[tokio::test]
async fn test_unknown_agent_is_not_retried() {
    let mut config = test_config();
    config.tasks[0].agent = "ghost".to_string();
    let completion = ScriptedCompletion::new(vec![]);
    let mut manager = manager(config, completion.clone());

    let err = manager.execute_tasks("q").await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownAgent(ref id) if id == "ghost"));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_cleanup_resets_run() {
    let completion = ScriptedCompletion::new(vec![Ok(RESEARCH_OK), Ok(WRITING_OK)]);
    let mut manager = manager(test_config(), completion);
    manager.execute_tasks("q").await.unwrap();

    manager.cleanup();
    assert_eq!(manager.state(), &RunState::Pending);
    assert!(manager.stage_result("research").is_none());
    assert_eq!(manager.progress_position("research"), None);
}

#[test]
fn test_update_progress_without_bar_is_ignored() {
    let manager = manager(test_config(), ScriptedCompletion::new(vec![]));
    manager.update_progress("missing", PROGRESS_TOTAL);
    assert_eq!(manager.progress_position("missing"), None);
}
