//! Launch configuration for the Chromium driver.

use serde::{Deserialize, Serialize};

/// How to launch and talk to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpConfig {
    /// Run without a visible window.
    /// Default: true
    pub headless: bool,

    /// Explicit Chrome/Chromium binary; autodetected when unset.
    #[serde(default)]
    pub executable: Option<String>,

    /// Initial window size, width x height in pixels.
    /// Default: 1600x800
    pub window_width: u32,
    pub window_height: u32,

    /// Per-command timeout in milliseconds.
    /// Default: 30000
    pub command_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1600,
            window_height: 800,
            command_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_headless_with_a_sane_window() {
        let config = CdpConfig::default();
        assert!(config.headless);
        assert_eq!((config.window_width, config.window_height), (1600, 800));
    }
}
