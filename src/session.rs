//! Single-session lifecycle: open on demand, reuse or recreate per
//! instruction, best-effort teardown.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::BrowserConfig;
use crate::core::Transport;
use crate::errors::{AutomationError, Result};

/// One live browser session. Owned exclusively by [`SessionManager`];
/// at most one exists at a time. The current URL is always read through
/// the transport, never cached here.
pub struct Session<T: Transport> {
    pub handle: T::Session,
    id: String,
}

impl<T: Transport> Session<T> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

pub struct SessionManager<T: Transport> {
    transport: Arc<T>,
    config: BrowserConfig,
    session: Option<Session<T>>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: Arc<T>, config: BrowserConfig) -> Self {
        Self {
            transport,
            config,
            session: None,
        }
    }

    /// Ensure a live session exists. With `reuse` false, or when the
    /// current session has died, any existing session is torn down first
    /// and a fresh one opened.
    pub async fn acquire(&mut self, reuse: bool) -> Result<&Session<T>> {
        let dead = self
            .session
            .as_ref()
            .is_some_and(|s| !self.transport.is_alive(&s.handle));
        if !reuse || dead {
            self.release().await;
        }

        if self.session.is_none() {
            let handle = self.transport.open_session(&self.config).await?;
            let id = uuid::Uuid::new_v4().to_string();
            info!(session = %id, "opened browser session");
            self.session = Some(Session { handle, id });
        }

        self.current()
    }

    pub fn current(&self) -> Result<&Session<T>> {
        self.session.as_ref().ok_or(AutomationError::SessionClosed)
    }

    /// Tear down the active session, if any. Teardown failures are logged,
    /// never propagated.
    pub async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            let id = session.id.clone();
            if let Err(err) = self.transport.close_session(session.handle).await {
                warn!(session = %id, error = %err, "session teardown failed");
            } else {
                info!(session = %id, "closed browser session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixturePage, FixtureTransport};

    fn transport() -> Arc<FixtureTransport> {
        Arc::new(FixtureTransport::new().page("https://shop.test/", FixturePage::new("Shop")))
    }

    #[tokio::test]
    async fn reuse_keeps_the_same_session() {
        let transport = transport();
        let mut manager = SessionManager::new(Arc::clone(&transport), Default::default());

        let first = manager.acquire(true).await.unwrap().id().to_string();
        let second = manager.acquire(true).await.unwrap().id().to_string();

        assert_eq!(first, second);
        assert_eq!(transport.sessions_opened(), 1);
    }

    #[tokio::test]
    async fn reuse_false_recreates_the_session() {
        let transport = transport();
        let mut manager = SessionManager::new(Arc::clone(&transport), Default::default());

        let first = manager.acquire(true).await.unwrap().id().to_string();
        let second = manager.acquire(false).await.unwrap().id().to_string();

        assert_ne!(first, second);
        assert_eq!(transport.sessions_opened(), 2);
        assert_eq!(transport.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let transport = transport();
        let mut manager = SessionManager::new(Arc::clone(&transport), Default::default());

        manager.acquire(true).await.unwrap();
        manager.release().await;
        manager.release().await;

        assert_eq!(transport.sessions_closed(), 1);
        assert!(manager.current().is_err());
    }
}
