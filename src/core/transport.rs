use async_trait::async_trait;

use crate::config::BrowserConfig;
use crate::errors::Result;
use crate::locator::Selector;

/// Wire-level automation transport.
///
/// Everything the engine needs from a browser: session lifecycle,
/// navigation, element lookup and primitive element actions. Lookup
/// distinguishes "no such element" (`Ok(None)`) from "the lookup itself
/// failed" (`Err`), so callers never branch on error identity.
#[async_trait]
pub trait Transport: Send + Sync {
    type Session: Send + Sync;
    type Element: Send + Sync + Clone;

    async fn open_session(&self, config: &BrowserConfig) -> Result<Self::Session>;

    async fn close_session(&self, session: Self::Session) -> Result<()>;

    fn is_alive(&self, session: &Self::Session) -> bool;

    async fn navigate(&self, session: &Self::Session, url: &str) -> Result<()>;

    async fn current_url(&self, session: &Self::Session) -> Result<String>;

    async fn title(&self, session: &Self::Session) -> Result<String>;

    async fn find(&self, session: &Self::Session, selector: &Selector)
        -> Result<Option<Self::Element>>;

    async fn find_all(
        &self,
        session: &Self::Session,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>>;

    async fn click(&self, session: &Self::Session, element: &Self::Element) -> Result<()>;

    async fn send_keys(
        &self,
        session: &Self::Session,
        element: &Self::Element,
        text: &str,
    ) -> Result<()>;

    async fn submit(&self, session: &Self::Session, element: &Self::Element) -> Result<()>;

    async fn text(&self, session: &Self::Session, element: &Self::Element) -> Result<String>;

    async fn attribute(
        &self,
        session: &Self::Session,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>>;

    async fn is_displayed(&self, session: &Self::Session, element: &Self::Element) -> Result<bool>;

    async fn is_enabled(&self, session: &Self::Session, element: &Self::Element) -> Result<bool>;

    /// Full page markup, used for post-mortem dumps on locator failures.
    async fn page_source(&self, session: &Self::Session) -> Result<String>;
}
