//! Locator strategies and priority-ordered fallback chains.
//!
//! A `Selector` describes one way to find an element; a `LocatorChain` is an
//! ordered bet on which page attribute is most stable. Resolution tries the
//! chain strictly in order and stops at the first strategy that matches.

use std::fmt;
use std::time::Duration;

/// One way of locating an element on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Css(String),
    ClassName(String),
    Name(String),
    /// Anchor element whose trimmed text equals the given string.
    LinkText(String),
    /// Button element whose text contains the given string.
    ButtonText(String),
}

impl Selector {
    pub fn id(value: impl Into<String>) -> Self {
        Selector::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Selector::ClassName(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Selector::Name(value.into())
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Selector::LinkText(value.into())
    }

    pub fn button_text(value: impl Into<String>) -> Self {
        Selector::ButtonText(value.into())
    }

    /// Lower the selector to a query the wire transport can execute.
    pub fn as_query(&self) -> Query {
        match self {
            Selector::Id(id) => Query::Css(format!("[id=\"{id}\"]")),
            Selector::Css(css) => Query::Css(css.clone()),
            Selector::ClassName(class) => Query::Css(format!(".{class}")),
            Selector::Name(name) => Query::Css(format!("[name=\"{name}\"]")),
            Selector::LinkText(text) => {
                Query::XPath(format!("//a[normalize-space(text())=\"{text}\"]"))
            }
            Selector::ButtonText(text) => Query::XPath(format!("//button[contains(., \"{text}\")]")),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "id={v}"),
            Selector::Css(v) => write!(f, "css={v}"),
            Selector::ClassName(v) => write!(f, "class={v}"),
            Selector::Name(v) => write!(f, "name={v}"),
            Selector::LinkText(v) => write!(f, "link-text={v}"),
            Selector::ButtonText(v) => write!(f, "button-text={v}"),
        }
    }
}

/// A selector lowered to the transport wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    XPath(String),
}

/// A selector plus the wait conditions that apply while polling for it.
#[derive(Debug, Clone)]
pub struct Locator {
    pub selector: Selector,
    /// Per-strategy timeout; falls back to the configured default when None.
    pub timeout: Option<Duration>,
    pub require_visible: bool,
}

impl Locator {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            timeout: None,
            require_visible: false,
        }
    }

    pub fn visible(mut self) -> Self {
        self.require_visible = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Locator::new(selector)
    }
}

/// Ordered fallback chain; first matching strategy wins, exhaustion fails.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    pub description: String,
    pub locators: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            locators: Vec::new(),
        }
    }

    pub fn strategy(mut self, locator: impl Into<Locator>) -> Self {
        self.locators.push(locator.into());
        self
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lowers_to_attribute_selector() {
        assert_eq!(
            Selector::id("user-name").as_query(),
            Query::Css("[id=\"user-name\"]".into())
        );
    }

    #[test]
    fn class_and_name_lower_to_css() {
        assert_eq!(
            Selector::class_name("inventory_list").as_query(),
            Query::Css(".inventory_list".into())
        );
        assert_eq!(
            Selector::name("commit").as_query(),
            Query::Css("[name=\"commit\"]".into())
        );
    }

    #[test]
    fn text_selectors_lower_to_xpath() {
        assert_eq!(
            Selector::link_text("Sign in").as_query(),
            Query::XPath("//a[normalize-space(text())=\"Sign in\"]".into())
        );
        assert_eq!(
            Selector::button_text("Star").as_query(),
            Query::XPath("//button[contains(., \"Star\")]".into())
        );
    }

    #[test]
    fn chain_preserves_declaration_order() {
        let chain = LocatorChain::new("search input")
            .strategy(Selector::id("query-builder-test"))
            .strategy(Selector::class_name("QueryBuilder-Input"))
            .strategy(Locator::new(Selector::css("input[placeholder*=\"Search\"]")).visible());

        assert_eq!(chain.locators.len(), 3);
        assert_eq!(chain.locators[0].selector, Selector::id("query-builder-test"));
        assert!(chain.locators[2].require_visible);
    }
}
