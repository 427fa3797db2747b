//! Code-host adapter: login (with re-login guard), repository search with
//! fallback chains, star-first-result.

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::core::Transport;
use crate::errors::{AutomationError, Result};
use crate::interrupt::{check_for_interruption, check_for_login_error};
use crate::locator::{Locator, LocatorChain, Selector};
use crate::resolve::{resolve, wait_for_url, wait_until_interactable};
use crate::sites::SiteContext;

const NO_RESULTS_PHRASE: &str = "No results matched your search";

fn profile_marker() -> LocatorChain {
    LocatorChain::new("signed-in profile marker")
        .strategy(Selector::css("[aria-label=\"View profile and more\"]"))
        .strategy(Selector::css("img.avatar-user"))
}

fn sign_in_link() -> LocatorChain {
    LocatorChain::new("sign-in link").strategy(Selector::link_text("Sign in"))
}

fn username_field() -> LocatorChain {
    LocatorChain::new("login field").strategy(Selector::id("login_field"))
}

fn password_field() -> LocatorChain {
    LocatorChain::new("password field").strategy(Selector::id("password"))
}

fn submit_button() -> LocatorChain {
    LocatorChain::new("sign-in submit").strategy(Selector::name("commit"))
}

fn search_activation() -> LocatorChain {
    LocatorChain::new("search activation control")
        .strategy(Selector::css("[data-target=\"qbsearch-input.inputButton\"]"))
}

// Progressively weaker bets: generated id, component class, placeholder.
fn search_input() -> LocatorChain {
    LocatorChain::new("search input field")
        .strategy(Selector::id("query-builder-test"))
        .strategy(Selector::class_name("QueryBuilder-Input"))
        .strategy(Selector::css("input[placeholder*=\"Search\"]"))
}

fn results_container() -> LocatorChain {
    LocatorChain::new("search results container")
        .strategy(Locator::new(Selector::css("[data-testid=\"results-list\"]")).visible())
        .strategy(Locator::new(Selector::css("div[role=\"list\"]")).visible())
        .strategy(Locator::new(Selector::css("div.search-results-container")).visible())
        .strategy(Locator::new(Selector::css("div[role=\"main\"]")).visible())
}

fn star_button() -> LocatorChain {
    LocatorChain::new("star button")
        .strategy(Selector::button_text("Star"))
        .strategy(Selector::css("button[aria-label=\"Star this repository\"]"))
}

pub async fn login<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
    username: &str,
    password: &str,
) -> Result<()> {
    let url = SiteContext::GitHub.root_url();
    transport.navigate(session, url).await?;
    let title = transport.title(session).await?;
    info!(%url, %title, "navigated to code host");

    sleep(config.timeouts.stability).await;
    check_for_interruption(transport, session, config).await?;

    if already_authenticated(transport, session).await? {
        info!("already signed in, skipping login");
        return Ok(());
    }

    let current = transport.current_url(session).await?;
    if current.contains("github") && !current.contains("/login") {
        let link = resolve(transport, session, &sign_in_link(), &config.timeouts).await?;
        transport.click(session, &link).await?;
        wait_for_url(
            transport,
            session,
            "/login",
            config.timeouts.locator,
            config.timeouts.poll_interval,
        )
        .await?;
        sleep(config.timeouts.stability).await;
        check_for_interruption(transport, session, config).await?;
    }

    let user = resolve(transport, session, &username_field(), &config.timeouts).await?;
    transport.send_keys(session, &user, username).await?;
    let pass = resolve(transport, session, &password_field(), &config.timeouts).await?;
    transport.send_keys(session, &pass, password).await?;

    let submit = resolve(transport, session, &submit_button(), &config.timeouts).await?;
    transport.click(session, &submit).await?;

    sleep(config.timeouts.post_submit).await;
    check_for_login_error(transport, session).await?;

    sleep(config.timeouts.stability).await;
    check_for_interruption(transport, session, config).await?;

    info!(%username, "code host login complete");
    Ok(())
}

pub async fn search<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
    query: &str,
) -> Result<()> {
    let current = transport.current_url(session).await?;
    if !current.contains("github") || current.contains("/search") {
        transport
            .navigate(session, SiteContext::GitHub.root_url())
            .await?;
        debug!("returned to code host root");
        sleep(config.timeouts.stability).await;
        check_for_interruption(transport, session, config).await?;
    }

    let activation = resolve(transport, session, &search_activation(), &config.timeouts).await?;
    transport.click(session, &activation).await?;

    let input = resolve(transport, session, &search_input(), &config.timeouts).await?;
    wait_until_interactable(
        transport,
        session,
        &input,
        "search input field",
        &config.timeouts,
    )
    .await?;

    info!(%query, "submitting search");
    transport.send_keys(session, &input, query).await?;
    transport.submit(session, &input).await?;
    sleep(config.timeouts.stability).await;

    check_for_interruption(transport, session, config).await?;

    resolve(transport, session, &results_container(), &config.timeouts).await?;

    if let Some(blankslate) = transport
        .find(session, &Selector::class_name("blankslate"))
        .await?
    {
        let text = transport.text(session, &blankslate).await?;
        if text.contains(NO_RESULTS_PHRASE) {
            return Err(AutomationError::NoResults(query.to_string()));
        }
    }
    Ok(())
}

pub async fn star_first_result<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
) -> Result<()> {
    let star = resolve(transport, session, &star_button(), &config.timeouts).await?;
    transport.click(session, &star).await?;
    info!("starred first result");
    sleep(config.timeouts.stability).await;
    Ok(())
}

/// Idempotent re-login guard: a resolvable profile marker means the session
/// is already authenticated.
async fn already_authenticated<T: Transport>(
    transport: &T,
    session: &T::Session,
) -> Result<bool> {
    for locator in &profile_marker().locators {
        if transport.find(session, &locator.selector).await?.is_some() {
            debug!(selector = %locator.selector, "profile marker present");
            return Ok(true);
        }
    }
    Ok(false)
}
