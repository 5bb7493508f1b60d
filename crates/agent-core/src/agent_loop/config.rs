//! Configuration for one agent run. All values are fixed at session start.

use serde::{Deserialize, Serialize};
use webpilot_core_types::Viewport;

use crate::coords::MODEL_SPACE;
use crate::governor::DEFAULT_SAFETY_CEILING;

/// Run parameters for the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Target viewport, enforced before the first model turn so coordinate
    /// mapping stays consistent.
    /// Default: 1600x800
    pub viewport: Viewport,

    /// Token budget for the conversation history; pruning kicks in above
    /// this.
    /// Default: 120_000
    pub token_limit: u64,

    /// Consecutive non-actionable model turns before aborting.
    /// Default: 15
    pub safety_ceiling: u32,

    /// The normalized grid the model expresses coordinates on.
    /// Default: 1000x1000
    pub action_space: Viewport,

    /// Model identifier passed to the provider.
    pub model: String,

    /// Default scroll distance in pixels when the model omits a magnitude.
    /// Default: 800
    pub scroll_magnitude: i32,

    /// Settle delay after each dispatched action, before the feedback
    /// capture, in milliseconds.
    /// Default: 1000
    pub settle_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1600, 800),
            token_limit: 120_000,
            safety_ceiling: DEFAULT_SAFETY_CEILING,
            action_space: MODEL_SPACE,
            model: "gemini-2.5-computer-use-preview".to_string(),
            scroll_magnitude: 800,
            settle_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.viewport, Viewport::new(1600, 800));
        assert_eq!(config.token_limit, 120_000);
        assert_eq!(config.safety_ceiling, 15);
        assert_eq!(config.action_space, Viewport::new(1000, 1000));
        assert_eq!(config.scroll_magnitude, 800);
        assert_eq!(config.settle_ms, 1000);
    }
}
