//! Chrome transport over the DevTools protocol.
//!
//! Element handles are re-resolved on every action: a handle is the lowered
//! query plus a match index, so a page mutating between resolution and use
//! degrades into a normal lookup failure instead of a stale-reference crash.

use std::ffi::OsStr;
use std::sync::Arc;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;

use crate::config::BrowserConfig;
use crate::core::Transport;
use crate::errors::{AutomationError, Result};
use crate::locator::{Query, Selector};

pub struct ChromeTransport;

pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

/// Query plus match index; each action re-runs the query in the page.
#[derive(Debug, Clone)]
pub struct ChromeElement {
    query: Query,
    index: usize,
}

impl ChromeTransport {
    pub fn new() -> Self {
        Self
    }

    fn eval(&self, session: &ChromeSession, script: &str) -> Result<Value> {
        let object = session
            .tab
            .evaluate(script, false)
            .map_err(|e| AutomationError::Transport(e.to_string()))?;
        Ok(object.value.unwrap_or(Value::Null))
    }

    fn run_element_action(
        &self,
        session: &ChromeSession,
        element: &ChromeElement,
        action_body: &str,
    ) -> Result<()> {
        let script = format!(
            "(function() {{ const element = {}; if (!element) return 'element vanished'; {} return 'ok'; }})()",
            element_expr(&element.query, element.index),
            action_body
        );
        let result = self.eval(session, &script)?;
        match result.as_str() {
            Some("ok") => Ok(()),
            Some(message) => Err(AutomationError::Transport(message.to_string())),
            None => Err(AutomationError::Transport(
                "element action returned no result".to_string(),
            )),
        }
    }
}

impl Default for ChromeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ChromeTransport {
    type Session = ChromeSession;
    type Element = ChromeElement;

    async fn open_session(&self, config: &BrowserConfig) -> Result<Self::Session> {
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={ua}"));

        let mut args = vec![OsStr::new("--no-sandbox"), OsStr::new("--disable-dev-shm-usage")];
        if let Some(ref ua) = user_agent_arg {
            args.push(OsStr::new(ua));
        }
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .args(args)
            .build()
            .map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AutomationError::Transport(e.to_string()))?;

        Ok(ChromeSession { browser, tab })
    }

    async fn close_session(&self, session: Self::Session) -> Result<()> {
        // Browser kills the child process on drop.
        drop(session);
        Ok(())
    }

    fn is_alive(&self, session: &Self::Session) -> bool {
        session.browser.get_process_id().is_some()
    }

    async fn navigate(&self, session: &Self::Session, url: &str) -> Result<()> {
        session
            .tab
            .navigate_to(url)
            .map_err(|e| AutomationError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        session
            .tab
            .wait_until_navigated()
            .map_err(|e| AutomationError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self, session: &Self::Session) -> Result<String> {
        Ok(session.tab.get_url())
    }

    async fn title(&self, session: &Self::Session) -> Result<String> {
        let result = self.eval(session, "document.title")?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn find(
        &self,
        session: &Self::Session,
        selector: &Selector,
    ) -> Result<Option<Self::Element>> {
        let query = selector.as_query();
        let count = self.eval(session, &count_expr(&query))?;
        if count.as_u64().unwrap_or(0) > 0 {
            Ok(Some(ChromeElement { query, index: 0 }))
        } else {
            Ok(None)
        }
    }

    async fn find_all(
        &self,
        session: &Self::Session,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>> {
        let query = selector.as_query();
        let count = self.eval(session, &count_expr(&query))?;
        let count = count.as_u64().unwrap_or(0) as usize;
        Ok((0..count)
            .map(|index| ChromeElement {
                query: query.clone(),
                index,
            })
            .collect())
    }

    async fn click(&self, session: &Self::Session, element: &Self::Element) -> Result<()> {
        self.run_element_action(
            session,
            element,
            "element.scrollIntoView({ block: 'center' }); element.click();",
        )
    }

    async fn send_keys(
        &self,
        session: &Self::Session,
        element: &Self::Element,
        text: &str,
    ) -> Result<()> {
        let body = format!(
            "element.focus(); \
             if ('value' in element) {{ element.value = {text}; }} \
             else {{ element.textContent = {text}; }} \
             element.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             element.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            text = js_string(text)
        );
        self.run_element_action(session, element, &body)
    }

    async fn submit(&self, session: &Self::Session, element: &Self::Element) -> Result<()> {
        self.run_element_action(
            session,
            element,
            "const form = element.form || element.closest('form'); \
             if (!form) return 'no enclosing form'; \
             if (form.requestSubmit) form.requestSubmit(); else form.submit();",
        )
    }

    async fn text(&self, session: &Self::Session, element: &Self::Element) -> Result<String> {
        let script = format!(
            "(function() {{ const element = {}; return element ? element.innerText : null; }})()",
            element_expr(&element.query, element.index)
        );
        let result = self.eval(session, &script)?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AutomationError::Transport("element vanished".to_string()))
    }

    async fn attribute(
        &self,
        session: &Self::Session,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>> {
        let script = format!(
            "(function() {{ const element = {}; return element ? element.getAttribute({}) : null; }})()",
            element_expr(&element.query, element.index),
            js_string(name)
        );
        let result = self.eval(session, &script)?;
        Ok(result.as_str().map(str::to_string))
    }

    async fn is_displayed(&self, session: &Self::Session, element: &Self::Element) -> Result<bool> {
        let script = format!(
            "(function() {{ const element = {}; \
               if (!element) return false; \
               const rect = element.getBoundingClientRect(); \
               const style = window.getComputedStyle(element); \
               return rect.width > 0 && rect.height > 0 \
                 && style.visibility !== 'hidden' && style.display !== 'none'; }})()",
            element_expr(&element.query, element.index)
        );
        let result = self.eval(session, &script)?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, session: &Self::Session, element: &Self::Element) -> Result<bool> {
        let script = format!(
            "(function() {{ const element = {}; return !!element && !element.disabled; }})()",
            element_expr(&element.query, element.index)
        );
        let result = self.eval(session, &script)?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn page_source(&self, session: &Self::Session) -> Result<String> {
        let result = self.eval(session, "document.documentElement.outerHTML")?;
        Ok(result.as_str().unwrap_or("").to_string())
    }
}

/// JS expression resolving a query to the element at `index`, or undefined.
fn element_expr(query: &Query, index: usize) -> String {
    match query {
        Query::Css(selector) => {
            format!("document.querySelectorAll({})[{}]", js_string(selector), index)
        }
        Query::XPath(xpath) => format!(
            "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotItem({})",
            js_string(xpath),
            index
        ),
    }
}

fn count_expr(query: &Query) -> String {
    match query {
        Query::Css(selector) => {
            format!("document.querySelectorAll({}).length", js_string(selector))
        }
        Query::XPath(xpath) => format!(
            "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
            js_string(xpath)
        ),
    }
}

/// Quote a Rust string as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_queries_lower_to_query_selector_all() {
        let expr = element_expr(&Selector::id("user-name").as_query(), 0);
        assert_eq!(expr, "document.querySelectorAll(\"[id=\\\"user-name\\\"]\")[0]");
    }

    #[test]
    fn xpath_queries_lower_to_document_evaluate() {
        let expr = count_expr(&Selector::button_text("Star").as_query());
        assert!(expr.contains("document.evaluate"));
        assert!(expr.contains("snapshotLength"));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
