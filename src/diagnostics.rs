//! Post-mortem page snapshots attached to locator failures.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use scraper::Html;
use serde::Serialize;

const MAX_CAPTURED_NAMES: usize = 64;

/// Structural summary of the page a locator chain failed against.
///
/// Carries enough of the DOM shape (tag census, ids, classes) to diagnose
/// "the site changed its markup" without hauling the full HTML around.
#[derive(Debug, Clone, Serialize)]
pub struct PageDump {
    pub url: String,
    pub title: String,
    pub captured_at: DateTime<Utc>,
    pub tag_census: BTreeMap<String, usize>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
}

impl PageDump {
    pub fn capture(url: &str, title: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut tag_census = BTreeMap::new();
        let mut ids = Vec::new();
        let mut classes = BTreeSet::new();

        for node in document.tree.values() {
            let scraper::Node::Element(element) = node else {
                continue;
            };
            *tag_census
                .entry(element.name().to_string())
                .or_insert(0usize) += 1;
            if let Some(id) = element.id() {
                if ids.len() < MAX_CAPTURED_NAMES {
                    ids.push(id.to_string());
                }
            }
            for class in element.classes() {
                if classes.len() < MAX_CAPTURED_NAMES {
                    classes.insert(class.to_string());
                }
            }
        }

        Self {
            url: url.to_string(),
            title: title.to_string(),
            captured_at: Utc::now(),
            tag_census,
            ids,
            classes: classes.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_summarizes_structure() {
        let html = r#"
            <html><head><title>Shop</title></head>
            <body>
                <div id="root" class="page shell">
                    <button class="btn btn_primary">Add</button>
                    <button class="btn">Remove</button>
                </div>
            </body></html>
        "#;
        let dump = PageDump::capture("https://shop.test/inventory", "Shop", html);

        assert_eq!(dump.tag_census.get("button"), Some(&2));
        assert!(dump.ids.contains(&"root".to_string()));
        assert!(dump.classes.contains(&"btn_primary".to_string()));
        assert_eq!(dump.url, "https://shop.test/inventory");
    }
}
