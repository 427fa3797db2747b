//! Scripted in-memory transport for exercising the engine without a
//! browser.
//!
//! A `FixtureTransport` is a small static site: pages keyed by URL, each a
//! flat list of elements. Clicks and submits can be wired to navigate, so
//! whole login/search/checkout flows can be replayed deterministically.
//! Every transport call is recorded for ordering assertions.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BrowserConfig, EngineConfig, RetryPolicy, Timeouts};
use crate::core::Transport;
use crate::errors::{AutomationError, Result};
use crate::locator::Selector;

/// Timeouts tightened from seconds to milliseconds so polling loops
/// exhaust quickly under test.
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        locator: Duration::from_millis(80),
        poll_interval: Duration::from_millis(10),
        stability: Duration::from_millis(5),
        post_submit: Duration::from_millis(5),
        interruption_ceiling: Duration::from_millis(300),
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        browser: BrowserConfig::default(),
        retry: RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        },
        timeouts: fast_timeouts(),
    }
}

#[derive(Debug, Clone)]
pub struct FixtureElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    attrs: HashMap<String, String>,
    visible: bool,
    enabled: bool,
    /// Remaining `is_displayed` calls before the element reports hidden.
    hide_after: Option<u32>,
    on_click: Option<String>,
    on_submit: Option<String>,
}

impl FixtureElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            text: String::new(),
            attrs: HashMap::new(),
            visible: true,
            enabled: true,
            hide_after: None,
            on_click: None,
            on_submit: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn hide_after(mut self, displayed_checks: u32) -> Self {
        self.hide_after = Some(displayed_checks);
        self
    }

    /// Clicking this element navigates the session to `url`.
    pub fn link_to(mut self, url: impl Into<String>) -> Self {
        self.on_click = Some(url.into());
        self
    }

    /// Submitting this element navigates the session to `url`.
    pub fn submit_to(mut self, url: impl Into<String>) -> Self {
        self.on_submit = Some(url.into());
        self
    }

    fn describe(&self) -> String {
        if let Some(id) = &self.id {
            format!("#{id}")
        } else if let Some(class) = self.classes.first() {
            format!(".{class}")
        } else {
            self.tag.clone()
        }
    }

    fn attr_value(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" => {
                if self.classes.is_empty() {
                    None
                } else {
                    Some(self.classes.join(" "))
                }
            }
            _ => self.attrs.get(name).cloned(),
        }
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Selector::ClassName(class) => self.classes.iter().any(|c| c == class),
            Selector::Name(name) => self.attrs.get("name") == Some(name),
            Selector::LinkText(text) => self.tag == "a" && self.text.trim() == text.as_str(),
            Selector::ButtonText(text) => self.tag == "button" && self.text.contains(text.as_str()),
            Selector::Css(pattern) => self.matches_css(pattern),
        }
    }

    // Supports the compound form `tag?(#id | .class | [attr="v"] | [attr*="v"])*`,
    // which covers every selector the site adapters use.
    fn matches_css(&self, pattern: &str) -> bool {
        let mut rest = pattern;
        let tag_end = rest
            .find(|c| c == '#' || c == '.' || c == '[')
            .unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" && self.tag != tag {
            return false;
        }
        rest = &rest[tag_end..];

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('#') {
                let end = after
                    .find(|c| c == '#' || c == '.' || c == '[')
                    .unwrap_or(after.len());
                if self.id.as_deref() != Some(&after[..end]) {
                    return false;
                }
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('.') {
                let end = after
                    .find(|c| c == '#' || c == '.' || c == '[')
                    .unwrap_or(after.len());
                if !self.classes.iter().any(|c| c == &after[..end]) {
                    return false;
                }
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let Some(end) = after.find(']') else {
                    return false;
                };
                if !self.matches_attr_test(&after[..end]) {
                    return false;
                }
                rest = &after[end + 1..];
            } else {
                return false;
            }
        }
        true
    }

    fn matches_attr_test(&self, body: &str) -> bool {
        if let Some((name, value)) = body.split_once("*=") {
            let value = value.trim_matches('"');
            self.attr_value(name)
                .is_some_and(|v| v.contains(value))
        } else if let Some((name, value)) = body.split_once('=') {
            let value = value.trim_matches('"');
            self.attr_value(name).as_deref() == Some(value)
        } else {
            self.attr_value(body).is_some()
        }
    }

    fn render(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if let Some(id) = &self.id {
            let _ = write!(out, " id=\"{id}\"");
        }
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", self.classes.join(" "));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, " {name}=\"{value}\"");
        }
        let _ = write!(out, ">{}</{}>", self.text, self.tag);
    }
}

#[derive(Debug, Clone)]
pub struct FixturePage {
    title: String,
    elements: Vec<FixtureElement>,
}

impl FixturePage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, element: FixtureElement) -> Self {
        self.elements.push(element);
        self
    }
}

/// Stable element reference: page URL plus index. Stays usable after the
/// session navigates away, but reports as not displayed there.
#[derive(Debug, Clone)]
pub struct FixtureHandle {
    page: String,
    index: usize,
}

#[derive(Debug)]
pub struct FixtureSession {
    id: u32,
}

#[derive(Default)]
struct FixtureState {
    pages: HashMap<String, FixturePage>,
    current: Option<String>,
    active_session: Option<u32>,
    opened: u32,
    closed: u32,
    events: Vec<String>,
}

/// In-memory [`Transport`] over a scripted set of pages.
#[derive(Default)]
pub struct FixtureTransport {
    state: Mutex<FixtureState>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: impl Into<String>, page: FixturePage) -> Self {
        self.lock().pages.insert(url.into(), page);
        self
    }

    pub fn sessions_opened(&self) -> u32 {
        self.lock().opened
    }

    pub fn sessions_closed(&self) -> u32 {
        self.lock().closed
    }

    /// Every navigate/click/type/submit recorded so far, in order.
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_element<R>(
        &self,
        handle: &FixtureHandle,
        f: impl FnOnce(&mut FixtureState, &mut FixtureElement) -> R,
    ) -> Result<R> {
        let mut state = self.lock();
        let mut page = state
            .pages
            .get(&handle.page)
            .cloned()
            .ok_or_else(|| AutomationError::Transport(format!("stale page {}", handle.page)))?;
        let Some(element) = page.elements.get_mut(handle.index) else {
            return Err(AutomationError::Transport(format!(
                "stale element #{} on {}",
                handle.index, handle.page
            )));
        };
        let result = f(&mut state, element);
        let element = element.clone();
        if let Some(live) = state
            .pages
            .get_mut(&handle.page)
            .and_then(|p| p.elements.get_mut(handle.index))
        {
            *live = element;
        }
        Ok(result)
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    type Session = FixtureSession;
    type Element = FixtureHandle;

    async fn open_session(&self, _config: &BrowserConfig) -> Result<Self::Session> {
        let mut state = self.lock();
        state.opened += 1;
        let id = state.opened;
        state.active_session = Some(id);
        state.current = None;
        Ok(FixtureSession { id })
    }

    async fn close_session(&self, session: Self::Session) -> Result<()> {
        let mut state = self.lock();
        if state.active_session == Some(session.id) {
            state.active_session = None;
        }
        state.closed += 1;
        Ok(())
    }

    fn is_alive(&self, session: &Self::Session) -> bool {
        self.lock().active_session == Some(session.id)
    }

    async fn navigate(&self, _session: &Self::Session, url: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.pages.contains_key(url) {
            return Err(AutomationError::Navigation {
                url: url.to_string(),
                message: "no such page in fixture".to_string(),
            });
        }
        state.current = Some(url.to_string());
        state.events.push(format!("navigate:{url}"));
        Ok(())
    }

    async fn current_url(&self, _session: &Self::Session) -> Result<String> {
        self.lock()
            .current
            .clone()
            .ok_or_else(|| AutomationError::Transport("no page loaded".to_string()))
    }

    async fn title(&self, _session: &Self::Session) -> Result<String> {
        let state = self.lock();
        let current = state
            .current
            .as_ref()
            .ok_or_else(|| AutomationError::Transport("no page loaded".to_string()))?;
        Ok(state
            .pages
            .get(current)
            .map(|p| p.title.clone())
            .unwrap_or_default())
    }

    async fn find(
        &self,
        _session: &Self::Session,
        selector: &Selector,
    ) -> Result<Option<Self::Element>> {
        let state = self.lock();
        let Some(current) = state.current.clone() else {
            return Ok(None);
        };
        let Some(page) = state.pages.get(&current) else {
            return Ok(None);
        };
        Ok(page
            .elements
            .iter()
            .position(|el| el.matches(selector))
            .map(|index| FixtureHandle {
                page: current,
                index,
            }))
    }

    async fn find_all(
        &self,
        _session: &Self::Session,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>> {
        let state = self.lock();
        let Some(current) = state.current.clone() else {
            return Ok(Vec::new());
        };
        let Some(page) = state.pages.get(&current) else {
            return Ok(Vec::new());
        };
        Ok(page
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.matches(selector))
            .map(|(index, _)| FixtureHandle {
                page: current.clone(),
                index,
            })
            .collect())
    }

    async fn click(&self, _session: &Self::Session, element: &Self::Element) -> Result<()> {
        self.with_element(element, |state, el| {
            state.events.push(format!("click:{}", el.describe()));
            if let Some(target) = el.on_click.clone() {
                state.current = Some(target);
            }
        })
    }

    async fn send_keys(
        &self,
        _session: &Self::Session,
        element: &Self::Element,
        text: &str,
    ) -> Result<()> {
        self.with_element(element, |state, el| {
            state.events.push(format!("type:{}={text}", el.describe()));
        })
    }

    async fn submit(&self, _session: &Self::Session, element: &Self::Element) -> Result<()> {
        self.with_element(element, |state, el| {
            state.events.push(format!("submit:{}", el.describe()));
            if let Some(target) = el.on_submit.clone() {
                state.current = Some(target);
            }
        })
    }

    async fn text(&self, _session: &Self::Session, element: &Self::Element) -> Result<String> {
        self.with_element(element, |_, el| el.text.clone())
    }

    async fn attribute(
        &self,
        _session: &Self::Session,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>> {
        self.with_element(element, |_, el| el.attr_value(name))
    }

    async fn is_displayed(&self, _session: &Self::Session, element: &Self::Element) -> Result<bool> {
        let current = self.lock().current.clone();
        if current.as_deref() != Some(element.page.as_str()) {
            return Ok(false);
        }
        self.with_element(element, |_, el| {
            if let Some(remaining) = el.hide_after {
                if remaining == 0 {
                    return false;
                }
                el.hide_after = Some(remaining - 1);
            }
            el.visible
        })
    }

    async fn is_enabled(&self, _session: &Self::Session, element: &Self::Element) -> Result<bool> {
        self.with_element(element, |_, el| el.enabled)
    }

    async fn page_source(&self, _session: &Self::Session) -> Result<String> {
        let state = self.lock();
        let Some(current) = state.current.as_ref() else {
            return Ok(String::new());
        };
        let Some(page) = state.pages.get(current) else {
            return Ok(String::new());
        };
        let mut html = format!(
            "<html><head><title>{}</title></head><body>",
            page.title
        );
        for element in &page.elements {
            element.render(&mut html);
        }
        html.push_str("</body></html>");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> FixtureElement {
        FixtureElement::new("button")
            .id("checkout")
            .class("btn_action")
            .class("btn_primary")
            .attr("data-testid", "checkout-button")
            .attr("aria-label", "Proceed to checkout")
            .text("Checkout")
    }

    #[test]
    fn css_matching_covers_adapter_selector_shapes() {
        let el = button();
        assert!(el.matches(&Selector::css("button")));
        assert!(el.matches(&Selector::css("#checkout")));
        assert!(el.matches(&Selector::css("button#checkout.btn_action")));
        assert!(el.matches(&Selector::css("[data-testid=\"checkout-button\"]")));
        assert!(el.matches(&Selector::css("[aria-label*=\"checkout\"]")));
        assert!(!el.matches(&Selector::css("div#checkout")));
        assert!(!el.matches(&Selector::css(".missing")));
        assert!(!el.matches(&Selector::css("[data-testid=\"other\"]")));
    }

    #[test]
    fn text_selectors_require_matching_tags() {
        let link = FixtureElement::new("a").text("Sign in");
        assert!(link.matches(&Selector::link_text("Sign in")));
        assert!(!link.matches(&Selector::button_text("Sign in")));

        let star = FixtureElement::new("button").text("Star this repo");
        assert!(star.matches(&Selector::button_text("Star")));
        assert!(!star.matches(&Selector::link_text("Star this repo")));
    }

    #[tokio::test]
    async fn clicks_follow_wired_navigation() {
        let transport = FixtureTransport::new()
            .page(
                "https://shop.test/",
                FixturePage::new("Shop")
                    .element(FixtureElement::new("a").class("cart").link_to("https://shop.test/cart")),
            )
            .page("https://shop.test/cart", FixturePage::new("Cart"));
        let session = transport.open_session(&Default::default()).await.unwrap();
        transport.navigate(&session, "https://shop.test/").await.unwrap();

        let cart = transport
            .find(&session, &Selector::class_name("cart"))
            .await
            .unwrap()
            .unwrap();
        transport.click(&session, &cart).await.unwrap();

        assert_eq!(
            transport.current_url(&session).await.unwrap(),
            "https://shop.test/cart"
        );
        assert_eq!(
            transport.events(),
            vec!["navigate:https://shop.test/", "click:.cart"]
        );
    }

    #[tokio::test]
    async fn navigation_to_unknown_page_fails() {
        let transport = FixtureTransport::new();
        let session = transport.open_session(&Default::default()).await.unwrap();
        let err = transport
            .navigate(&session, "https://missing.test/")
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::Navigation { url, .. } if url.contains("missing")));
    }
}
