pub mod agents;
pub mod cache;
pub mod cli;
pub mod config;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{QueryOutcome, ResearchAssistant, RunMode, launch};
