//! Detection of human-verification interruptions (CAPTCHA / 2FA) and the
//! post-login inline error check.

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::Transport;
use crate::errors::{AutomationError, Result};
use crate::locator::{LocatorChain, Selector};

/// Markers the supported sites use for CAPTCHA and two-factor prompts,
/// most specific first.
pub fn interruption_markers() -> LocatorChain {
    LocatorChain::new("CAPTCHA/2FA marker")
        .strategy(Selector::id("captcha"))
        .strategy(Selector::id("captcha-form"))
        .strategy(Selector::css("form#captcha-form"))
        .strategy(Selector::class_name("g-recaptcha"))
        .strategy(Selector::id("two-factor-authentication"))
        .strategy(Selector::css("[data-testid=\"otp-container\"]"))
        .strategy(Selector::css(".js-two-factor-prompt"))
}

/// Poll for a verification marker; if one shows up, suspend until a human
/// clears it (the marker goes invisible), bounded by the configured ceiling.
///
/// Returns `Ok(true)` when a challenge was found and waited out, `Ok(false)`
/// when no marker ever matched — the absence of a challenge is the normal
/// path, not an error.
pub async fn check_for_interruption<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
) -> Result<bool> {
    let policy = config.retry;
    let mut marker = None;
    for attempt in 1..=policy.max_attempts {
        marker = find_marker(transport, session).await?;
        if marker.is_some() {
            break;
        }
        debug!(attempt, "no verification marker");
        if attempt < policy.max_attempts {
            sleep(policy.delay).await;
        }
    }

    let Some(marker) = marker else {
        debug!("no CAPTCHA or 2FA challenge found");
        return Ok(false);
    };

    warn!(
        ceiling = ?config.timeouts.interruption_ceiling,
        "verification challenge detected; waiting for manual resolution"
    );

    let deadline = Instant::now() + config.timeouts.interruption_ceiling;
    loop {
        // A marker that disappeared from the page counts as resolved.
        let visible = transport
            .is_displayed(session, &marker)
            .await
            .unwrap_or(false);
        if !visible {
            info!("verification challenge cleared, proceeding");
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::InterruptionTimeout(
                config.timeouts.interruption_ceiling,
            ));
        }
        sleep(config.timeouts.poll_interval).await;
    }
}

/// One-shot check for the inline login failure banner. The marker being
/// absent, or present but empty, is success; present with text fails with
/// that text.
pub async fn check_for_login_error<T: Transport>(
    transport: &T,
    session: &T::Session,
) -> Result<()> {
    let Some(banner) = transport
        .find(session, &Selector::class_name("flash-error"))
        .await?
    else {
        return Ok(());
    };

    let text = transport.text(session, &banner).await?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    Err(AutomationError::Login(text.to_string()))
}

async fn find_marker<T: Transport>(
    transport: &T,
    session: &T::Session,
) -> Result<Option<T::Element>> {
    for locator in &interruption_markers().locators {
        if let Some(element) = transport.find(session, &locator.selector).await? {
            debug!(selector = %locator.selector, "verification marker matched");
            return Ok(Some(element));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_config, FixtureElement, FixturePage, FixtureTransport};

    async fn session_on(
        transport: &FixtureTransport,
        url: &str,
    ) -> <FixtureTransport as Transport>::Session {
        let session = transport.open_session(&Default::default()).await.unwrap();
        transport.navigate(&session, url).await.unwrap();
        session
    }

    #[tokio::test]
    async fn absence_of_markers_is_not_an_error() {
        let transport = FixtureTransport::new().page(
            "https://code.test/login",
            FixturePage::new("Sign in").element(FixtureElement::new("input").id("login_field")),
        );
        let session = session_on(&transport, "https://code.test/login").await;

        let found = check_for_interruption(&transport, &session, &fast_config())
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn waits_out_a_challenge_that_gets_resolved() {
        let transport = FixtureTransport::new().page(
            "https://code.test/login",
            FixturePage::new("Sign in")
                .element(FixtureElement::new("div").class("g-recaptcha").hide_after(2)),
        );
        let session = session_on(&transport, "https://code.test/login").await;

        let found = check_for_interruption(&transport, &session, &fast_config())
            .await
            .unwrap();
        assert!(found);
    }

    #[tokio::test]
    async fn unresolved_challenge_times_out() {
        let transport = FixtureTransport::new().page(
            "https://code.test/login",
            FixturePage::new("Sign in")
                .element(FixtureElement::new("div").id("two-factor-authentication")),
        );
        let session = session_on(&transport, "https://code.test/login").await;

        let err = check_for_interruption(&transport, &session, &fast_config())
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::InterruptionTimeout(_)));
    }

    #[tokio::test]
    async fn login_error_banner_with_text_fails() {
        let transport = FixtureTransport::new().page(
            "https://code.test/session",
            FixturePage::new("Sign in").element(
                FixtureElement::new("div")
                    .class("flash-error")
                    .text("Incorrect username or password."),
            ),
        );
        let session = session_on(&transport, "https://code.test/session").await;

        let err = check_for_login_error(&transport, &session).await.unwrap_err();
        assert!(matches!(err, AutomationError::Login(msg) if msg.contains("Incorrect")));
    }

    #[tokio::test]
    async fn empty_banner_is_distinguished_from_a_real_error() {
        let transport = FixtureTransport::new().page(
            "https://code.test/session",
            FixturePage::new("Sign in")
                .element(FixtureElement::new("div").class("flash-error").text("  ")),
        );
        let session = session_on(&transport, "https://code.test/session").await;

        assert!(check_for_login_error(&transport, &session).await.is_ok());
    }
}
