#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::LLMProvider;
    use crate::pipeline::RunMode;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["llama-search"]).unwrap();

        assert!(args.query.is_none());
        assert!(args.config.is_none());
        assert!(!args.no_cache);
        assert!(!args.prune_cache);
        assert!(!args.skip_connection_check);
        assert!(!args.verbose);
        assert_eq!(args.run_mode(), RunMode::Interactive);
    }

    #[test]
    fn test_args_positional_query() {
        let args = Args::try_parse_from(["llama-search", "what is rust?", "-v"]).unwrap();

        assert_eq!(args.query.as_deref(), Some("what is rust?"));
        assert!(args.verbose);
        assert_eq!(args.run_mode(), RunMode::Single("what is rust?".to_string()));
    }

    #[test]
    fn test_prune_cache_takes_precedence() {
        let args = Args::try_parse_from(["llama-search", "q", "--prune-cache"]).unwrap();
        assert_eq!(args.run_mode(), RunMode::PruneCache);
    }

    #[test]
    fn test_args_llm_options() {
        let args = Args::try_parse_from([
            "llama-search",
            "--llm-provider",
            "openai",
            "--model",
            "gpt-4o-mini",
            "--llm-api-base-url",
            "https://api.example.com/v1",
            "--llm-api-key",
            "secret",
            "--max-tokens",
            "2048",
            "--temperature",
            "0.7",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_base_url, "https://api.example.com/v1");
        assert_eq!(config.llm.api_key, "secret");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.llm.temperature, 0.7);
    }

    #[test]
    fn test_args_pipeline_and_cache_options() {
        let args = Args::try_parse_from([
            "llama-search",
            "--max-retries",
            "5",
            "--query-timeout",
            "30",
            "--no-cache",
            "--cache-dir",
            "/tmp/llama-cache",
            "--skip-connection-check",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.pipeline.max_retries, 5);
        assert_eq!(config.pipeline.query_timeout_seconds, 30);
        assert!(!config.pipeline.check_connection);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.cache_dir, PathBuf::from("/tmp/llama-cache"));
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let args = Args::try_parse_from(["llama-search", "--llm-provider", "mystery"]).unwrap();
        let err = args.into_config().unwrap_err();
        assert!(err.to_string().contains("Unknown provider: mystery"));
    }

    #[test]
    fn test_zero_retries_is_rejected() {
        let args = Args::try_parse_from(["llama-search", "--max-retries", "0"]).unwrap();
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_config_file_with_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        std::fs::write(
            &config_path,
            r#"
verbose = false

[llm]
provider = "ollama"
model = "llama3.2"

[pipeline]
max_retries = 2
"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "llama-search",
            "--config",
            config_path.to_str().unwrap(),
            "--model",
            "mistral",
            "--verbose",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.llm.provider, LLMProvider::Ollama);
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.pipeline.max_retries, 2);
        assert!(config.verbose);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args =
            Args::try_parse_from(["llama-search", "--config", "/nonexistent/llama.toml"]).unwrap();
        assert!(args.into_config().is_err());
    }
}
