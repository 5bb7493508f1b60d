//! Layered run configuration: TOML file plus `WEBPILOT_*` environment
//! overrides.

use std::path::Path;
use std::time::Duration;

use agent_core::AgentConfig;
use anyhow::{Context, Result};
use cdp_adapter::CdpConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use webpilot_core_types::Viewport;

use crate::llm::GeminiConfig;

/// Top-level configuration for one CLI run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub agent: AgentSettings,
    pub browser: BrowserSettings,
    pub gemini: GeminiSettings,
    /// When set, step attachments and the run log are written here.
    pub audit_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub token_limit: u64,
    pub safety_ceiling: u32,
    pub scroll_magnitude: i32,
    pub settle_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let defaults = AgentConfig::default();
        Self {
            viewport_width: defaults.viewport.width,
            viewport_height: defaults.viewport.height,
            token_limit: defaults.token_limit,
            safety_ceiling: defaults.safety_ceiling,
            scroll_magnitude: defaults.scroll_magnitude,
            settle_ms: defaults.settle_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_ms: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        let defaults = GeminiConfig::default();
        Self {
            api_key: None,
            model: defaults.model,
            api_base: defaults.api_base,
            timeout_ms: defaults.timeout.as_millis() as u64,
        }
    }
}

impl CliConfig {
    /// Load from an optional TOML file, then apply `WEBPILOT_*` overrides
    /// (e.g. `WEBPILOT_GEMINI__API_KEY`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        } else {
            builder = builder.add_source(File::with_name("webpilot").required(false));
        }
        builder
            .add_source(Environment::with_prefix("WEBPILOT").separator("__"))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("malformed configuration")
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            viewport: Viewport::new(self.agent.viewport_width, self.agent.viewport_height),
            token_limit: self.agent.token_limit,
            safety_ceiling: self.agent.safety_ceiling,
            model: self.gemini.model.clone(),
            scroll_magnitude: self.agent.scroll_magnitude,
            settle_ms: self.agent.settle_ms,
            ..AgentConfig::default()
        }
    }

    pub fn cdp_config(&self) -> CdpConfig {
        CdpConfig {
            headless: self.browser.headless,
            executable: self.browser.executable.clone(),
            window_width: self.agent.viewport_width,
            window_height: self.agent.viewport_height,
            ..CdpConfig::default()
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini.api_key.clone().unwrap_or_default(),
            model: self.gemini.model.clone(),
            api_base: self.gemini.api_base.clone(),
            timeout: Duration::from_millis(self.gemini.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_line_up_with_the_agent_core_defaults() {
        let config = CliConfig::default();
        let agent = config.agent_config();
        assert_eq!(agent.viewport, Viewport::new(1600, 800));
        assert_eq!(agent.safety_ceiling, 15);
        assert_eq!(agent.token_limit, 120_000);
    }

    #[test]
    fn toml_files_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[agent]\nviewport_width = 1280\nviewport_height = 720\n\n[gemini]\nmodel = \"gemini-x\""
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.agent.viewport_width, 1280);
        assert_eq!(config.gemini.model, "gemini-x");
        // Untouched settings keep their defaults.
        assert!(config.browser.headless);
    }
}
