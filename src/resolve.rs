//! Resilient element resolution over priority-ordered locator chains.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::config::Timeouts;
use crate::core::Transport;
use crate::diagnostics::PageDump;
use crate::errors::{AutomationError, Result};
use crate::locator::{Locator, LocatorChain};

/// Try each strategy of `chain` in declared order; the first one that
/// produces a matching element wins and no later strategy is attempted.
/// Exhausting the chain fails with the chain description and a structural
/// dump of the current page for post-mortem inspection.
pub async fn resolve<T: Transport>(
    transport: &T,
    session: &T::Session,
    chain: &LocatorChain,
    timeouts: &Timeouts,
) -> Result<T::Element> {
    for locator in &chain.locators {
        let timeout = locator.timeout.unwrap_or(timeouts.locator);
        match wait_for(transport, session, locator, timeout, timeouts.poll_interval).await {
            Some(element) => {
                debug!(chain = %chain, selector = %locator.selector, "strategy matched");
                return Ok(element);
            }
            None => {
                debug!(chain = %chain, selector = %locator.selector, "strategy exhausted");
            }
        }
    }

    let dump = page_dump(transport, session).await;
    Err(AutomationError::element_not_found(
        chain.description.clone(),
        dump,
    ))
}

/// Variant for list lookups: wait until the strategy matches at least one
/// element, then return all of them.
pub async fn resolve_all<T: Transport>(
    transport: &T,
    session: &T::Session,
    locator: &Locator,
    timeouts: &Timeouts,
) -> Result<Vec<T::Element>> {
    let timeout = locator.timeout.unwrap_or(timeouts.locator);
    let deadline = Instant::now() + timeout;
    loop {
        match transport.find_all(session, &locator.selector).await {
            Ok(elements) if !elements.is_empty() => return Ok(elements),
            Ok(_) => {}
            Err(err) => trace!(selector = %locator.selector, error = %err, "lookup failed during poll"),
        }
        if Instant::now() >= deadline {
            break;
        }
        sleep(timeouts.poll_interval).await;
    }

    let dump = page_dump(transport, session).await;
    Err(AutomationError::element_not_found(
        locator.selector.to_string(),
        dump,
    ))
}

/// Bounded wait for the session URL to contain `fragment`.
pub async fn wait_for_url<T: Transport>(
    transport: &T,
    session: &T::Session,
    fragment: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let url = transport.current_url(session).await?;
        if url.contains(fragment) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::Navigation {
                url: fragment.to_string(),
                message: format!("URL still {url} after {timeout:?}"),
            });
        }
        sleep(poll_interval).await;
    }
}

/// Bounded wait for an already-resolved element to become enabled and
/// visible before interacting with it.
pub async fn wait_until_interactable<T: Transport>(
    transport: &T,
    session: &T::Session,
    element: &T::Element,
    description: &str,
    timeouts: &Timeouts,
) -> Result<()> {
    let deadline = Instant::now() + timeouts.locator;
    loop {
        let enabled = transport.is_enabled(session, element).await.unwrap_or(false);
        let visible = transport
            .is_displayed(session, element)
            .await
            .unwrap_or(false);
        if enabled && visible {
            return Ok(());
        }
        if Instant::now() >= deadline {
            let dump = page_dump(transport, session).await;
            return Err(AutomationError::element_not_found(
                format!("{description} (interactable)"),
                dump,
            ));
        }
        sleep(timeouts.poll_interval).await;
    }
}

async fn wait_for<T: Transport>(
    transport: &T,
    session: &T::Session,
    locator: &Locator,
    timeout: Duration,
    poll_interval: Duration,
) -> Option<T::Element> {
    let deadline = Instant::now() + timeout;
    loop {
        match transport.find(session, &locator.selector).await {
            Ok(Some(element)) => {
                let visible_enough = !locator.require_visible
                    || transport
                        .is_displayed(session, &element)
                        .await
                        .unwrap_or(false);
                if visible_enough {
                    return Some(element);
                }
            }
            Ok(None) => {}
            Err(err) => trace!(selector = %locator.selector, error = %err, "lookup failed during poll"),
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(poll_interval).await;
    }
}

/// Best-effort page snapshot; diagnostics must never mask the original failure.
pub(crate) async fn page_dump<T: Transport>(
    transport: &T,
    session: &T::Session,
) -> Option<PageDump> {
    let url = transport.current_url(session).await.ok()?;
    let title = transport.title(session).await.unwrap_or_default();
    let html = transport.page_source(session).await.ok()?;
    Some(PageDump::capture(&url, &title, &html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Selector;
    use crate::testing::{fast_timeouts, FixtureElement, FixturePage, FixtureTransport};

    fn storefront() -> FixtureTransport {
        FixtureTransport::new().page(
            "https://shop.test/",
            FixturePage::new("Shop").element(
                FixtureElement::new("button")
                    .id("checkout")
                    .class("btn_action")
                    .text("Checkout"),
            ),
        )
    }

    #[tokio::test]
    async fn first_matching_strategy_wins() {
        let transport = storefront();
        let session = transport.open_session(&Default::default()).await.unwrap();
        transport.navigate(&session, "https://shop.test/").await.unwrap();

        let chain = LocatorChain::new("checkout control")
            .strategy(Selector::id("missing"))
            .strategy(Selector::class_name("btn_action"))
            .strategy(Selector::id("checkout"));

        let element = resolve(&transport, &session, &chain, &fast_timeouts())
            .await
            .unwrap();
        // matched via the second strategy, third never attempted
        assert_eq!(
            transport.text(&session, &element).await.unwrap(),
            "Checkout"
        );
    }

    #[tokio::test]
    async fn exhausted_chain_reports_description_and_dump() {
        let transport = storefront();
        let session = transport.open_session(&Default::default()).await.unwrap();
        transport.navigate(&session, "https://shop.test/").await.unwrap();

        let chain = LocatorChain::new("missing widget")
            .strategy(Selector::id("nope"))
            .strategy(Selector::class_name("also-nope"));

        let err = resolve(&transport, &session, &chain, &fast_timeouts())
            .await
            .unwrap_err();
        match err {
            AutomationError::ElementNotFound { chain, dump } => {
                assert_eq!(chain, "missing widget");
                let dump = dump.expect("page dump attached");
                assert!(dump.ids.contains(&"checkout".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn visibility_requirement_rejects_hidden_elements() {
        let transport = FixtureTransport::new().page(
            "https://shop.test/",
            FixturePage::new("Shop")
                .element(FixtureElement::new("div").class("results").hidden()),
        );
        let session = transport.open_session(&Default::default()).await.unwrap();
        transport.navigate(&session, "https://shop.test/").await.unwrap();

        let chain = LocatorChain::new("visible results")
            .strategy(Locator::new(Selector::class_name("results")).visible());

        assert!(resolve(&transport, &session, &chain, &fast_timeouts())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn resolve_all_returns_every_match() {
        let transport = FixtureTransport::new().page(
            "https://shop.test/",
            FixturePage::new("Shop")
                .element(FixtureElement::new("div").class("inventory_item_name").text("Backpack"))
                .element(FixtureElement::new("div").class("inventory_item_name").text("Bike Light")),
        );
        let session = transport.open_session(&Default::default()).await.unwrap();
        transport.navigate(&session, "https://shop.test/").await.unwrap();

        let items = resolve_all(
            &transport,
            &session,
            &Locator::new(Selector::class_name("inventory_item_name")),
            &fast_timeouts(),
        )
        .await
        .unwrap();
        assert_eq!(items.len(), 2);
    }
}
