//! Per-site adapters: the concrete locator chains and step sequences for
//! the supported sites.

pub mod github;
pub mod saucedemo;

use url::Url;

/// Which adapter (and which locator chains) apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteContext {
    SauceDemo,
    GitHub,
}

impl SiteContext {
    /// From the `<site>` parameter of a login clause.
    pub fn from_site_name(name: &str) -> Option<Self> {
        match name {
            "saucedemo" => Some(SiteContext::SauceDemo),
            "github" => Some(SiteContext::GitHub),
            _ => None,
        }
    }

    /// From the session's current URL, for clauses that carry no site
    /// parameter of their own.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        if host.contains("saucedemo") {
            Some(SiteContext::SauceDemo)
        } else if host.contains("github") {
            Some(SiteContext::GitHub)
        } else {
            None
        }
    }

    pub fn root_url(&self) -> &'static str {
        match self {
            SiteContext::SauceDemo => "https://www.saucedemo.com",
            SiteContext::GitHub => "https://github.com",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_names_map_to_contexts() {
        assert_eq!(
            SiteContext::from_site_name("saucedemo"),
            Some(SiteContext::SauceDemo)
        );
        assert_eq!(
            SiteContext::from_site_name("github"),
            Some(SiteContext::GitHub)
        );
        assert_eq!(SiteContext::from_site_name("example"), None);
    }

    #[test]
    fn context_is_derived_from_the_url_host() {
        assert_eq!(
            SiteContext::from_url("https://www.saucedemo.com/inventory.html"),
            Some(SiteContext::SauceDemo)
        );
        assert_eq!(
            SiteContext::from_url("https://github.com/search?q=rust"),
            Some(SiteContext::GitHub)
        );
        assert_eq!(SiteContext::from_url("https://example.com/"), None);
        assert_eq!(SiteContext::from_url("not a url"), None);
    }
}
