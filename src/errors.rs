use std::time::Duration;

use thiserror::Error;

use crate::diagnostics::PageDump;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Invalid command: {0}")]
    Parse(String),

    #[error("No element matched locator chain '{chain}'")]
    ElementNotFound {
        chain: String,
        dump: Option<PageDump>,
    },

    #[error("No item matched \"{0}\"")]
    NoMatch(String),

    #[error("No search results for \"{0}\"")]
    NoResults(String),

    #[error("Login rejected: {0}")]
    Login(String),

    #[error("Verification challenge was not resolved within {0:?}")]
    InterruptionTimeout(Duration),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No site adapter for {0}")]
    UnsupportedSite(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("No active session")]
    SessionClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AutomationError>;

impl AutomationError {
    pub fn element_not_found(chain: impl Into<String>, dump: Option<PageDump>) -> Self {
        AutomationError::ElementNotFound {
            chain: chain.into(),
            dump,
        }
    }
}

// Convert anyhow::Error raised inside the CDP transport to AutomationError
impl From<anyhow::Error> for AutomationError {
    fn from(err: anyhow::Error) -> Self {
        AutomationError::Transport(err.to_string())
    }
}
