use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub browser: BrowserConfig,
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Bounded re-attempt policy, attached per invocation rather than globally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Default per-strategy wait while resolving a locator chain.
    pub locator: Duration,
    pub poll_interval: Duration,
    /// Fixed settle wait after navigation or a page-changing click.
    pub stability: Duration,
    /// Pause between form submission and the follow-up error check.
    pub post_submit: Duration,
    /// Ceiling on waiting for a human to clear a verification challenge.
    pub interruption_ceiling: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            retry: RetryPolicy::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            args: vec![],
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            locator: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
            stability: Duration::from_millis(2000),
            post_submit: Duration::from_millis(1000),
            interruption_ceiling: Duration::from_secs(60),
        }
    }
}
