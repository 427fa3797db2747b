//! Storefront adapter: login, inventory search, add-to-cart, checkout.

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::core::Transport;
use crate::errors::{AutomationError, Result};
use crate::interrupt::check_for_interruption;
use crate::locator::{Locator, LocatorChain, Selector};
use crate::resolve::{resolve, resolve_all};
use crate::sites::SiteContext;

fn username_field() -> LocatorChain {
    LocatorChain::new("username field").strategy(Selector::id("user-name"))
}

fn password_field() -> LocatorChain {
    LocatorChain::new("password field").strategy(Selector::id("password"))
}

fn login_button() -> LocatorChain {
    LocatorChain::new("login button").strategy(Selector::id("login-button"))
}

fn inventory_marker() -> LocatorChain {
    LocatorChain::new("inventory page marker").strategy(Selector::class_name("inventory_list"))
}

fn add_to_cart_button() -> LocatorChain {
    LocatorChain::new("add-to-cart button").strategy(Selector::class_name("btn_inventory"))
}

fn cart_link() -> LocatorChain {
    LocatorChain::new("cart link").strategy(Selector::class_name("shopping_cart_link"))
}

fn checkout_button() -> LocatorChain {
    LocatorChain::new("checkout button").strategy(Selector::id("checkout"))
}

fn checkout_info_marker() -> LocatorChain {
    LocatorChain::new("checkout information page").strategy(Selector::class_name("checkout_info"))
}

pub async fn login<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
    username: &str,
    password: &str,
) -> Result<()> {
    let url = SiteContext::SauceDemo.root_url();
    transport.navigate(session, url).await?;
    let title = transport.title(session).await?;
    info!(%url, %title, "navigated to storefront");

    sleep(config.timeouts.stability).await;
    check_for_interruption(transport, session, config).await?;

    let user = resolve(transport, session, &username_field(), &config.timeouts).await?;
    transport.send_keys(session, &user, username).await?;
    let pass = resolve(transport, session, &password_field(), &config.timeouts).await?;
    transport.send_keys(session, &pass, password).await?;

    let submit = resolve(transport, session, &login_button(), &config.timeouts).await?;
    transport.click(session, &submit).await?;

    resolve(transport, session, &inventory_marker(), &config.timeouts).await?;
    info!(%username, "storefront login complete");
    Ok(())
}

/// Scan the inventory for the first item whose name contains `query`
/// (case-insensitive) and open it.
pub async fn search<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
    query: &str,
) -> Result<()> {
    let items = resolve_all(
        transport,
        session,
        &Locator::new(Selector::class_name("inventory_item_name")),
        &config.timeouts,
    )
    .await?;

    let needle = query.to_lowercase();
    for item in &items {
        let name = transport.text(session, item).await?;
        if name.to_lowercase().contains(&needle) {
            info!(item = %name, %query, "matched inventory item");
            transport.click(session, item).await?;
            return Ok(());
        }
        debug!(item = %name, "no match");
    }
    Err(AutomationError::NoMatch(query.to_string()))
}

pub async fn add_to_cart<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
) -> Result<()> {
    let button = resolve(transport, session, &add_to_cart_button(), &config.timeouts).await?;
    transport.click(session, &button).await?;
    info!("item added to cart");
    sleep(config.timeouts.stability).await;
    Ok(())
}

pub async fn checkout<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
) -> Result<()> {
    let cart = resolve(transport, session, &cart_link(), &config.timeouts).await?;
    transport.click(session, &cart).await?;

    let checkout = resolve(transport, session, &checkout_button(), &config.timeouts).await?;
    transport.click(session, &checkout).await?;
    sleep(config.timeouts.stability).await;

    resolve(transport, session, &checkout_info_marker(), &config.timeouts).await?;
    info!("checkout information page reached");
    Ok(())
}
