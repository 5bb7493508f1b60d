//! WebPilot CLI: wiring between configuration, the Gemini provider, the
//! CDP driver, and the agent core.

pub mod config;
pub mod llm;

pub use config::CliConfig;
pub use llm::{GeminiConfig, GeminiProvider};
