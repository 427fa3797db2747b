//! Instruction execution: interpret, then run each clause in source order
//! against the single live session, each wrapped in the retry executor.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::command::{interpret, Intent};
use crate::config::EngineConfig;
use crate::core::Transport;
use crate::errors::{AutomationError, Result};
use crate::retry::with_retry;
use crate::session::SessionManager;
use crate::sites::{github, saucedemo, SiteContext};

pub struct Engine<T: Transport> {
    transport: Arc<T>,
    sessions: SessionManager<T>,
    config: EngineConfig,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        let transport = Arc::new(transport);
        let sessions = SessionManager::new(Arc::clone(&transport), config.browser.clone());
        Self {
            transport,
            sessions,
            config,
        }
    }

    /// Execute one instruction. Clauses run strictly in source order; the
    /// first clause to fail (after retries) aborts the rest of the
    /// instruction but leaves the session usable for the next one.
    pub async fn run(&mut self, instruction: &str, reuse_session: bool) -> Result<()> {
        info!(%instruction, "processing instruction");
        let commands = interpret(instruction)?;

        self.sessions.acquire(reuse_session).await?;
        let session = self.sessions.current()?;

        for command in &commands {
            if matches!(command.intent, Intent::Unrecognized) {
                debug!(clause = %command.raw, "unrecognized clause skipped");
                continue;
            }
            let outcome = with_retry(&command.raw, self.config.retry, || {
                dispatch(
                    self.transport.as_ref(),
                    &session.handle,
                    &self.config,
                    &command.intent,
                )
            })
            .await;

            if let Err(err) = outcome {
                error!(clause = %command.raw, error = %err, "instruction aborted");
                return Err(err);
            }
            info!(clause = %command.raw, "clause complete");
        }
        Ok(())
    }

    /// Final teardown once the caller is done issuing instructions.
    pub async fn shutdown(&mut self) {
        self.sessions.release().await;
    }

    pub async fn current_url(&self) -> Result<String> {
        let session = self.sessions.current()?;
        self.transport.current_url(&session.handle).await
    }
}

async fn dispatch<T: Transport>(
    transport: &T,
    session: &T::Session,
    config: &EngineConfig,
    intent: &Intent,
) -> Result<()> {
    match intent {
        Intent::Login {
            site,
            username,
            password,
        } => {
            let context = SiteContext::from_site_name(site)
                .ok_or_else(|| AutomationError::UnsupportedSite(site.clone()))?;
            match context {
                SiteContext::SauceDemo => {
                    saucedemo::login(transport, session, config, username, password).await
                }
                SiteContext::GitHub => {
                    github::login(transport, session, config, username, password).await
                }
            }
        }
        Intent::Search { query } => {
            let url = transport.current_url(session).await?;
            match SiteContext::from_url(&url) {
                Some(SiteContext::SauceDemo) => {
                    saucedemo::search(transport, session, config, query).await
                }
                Some(SiteContext::GitHub) => github::search(transport, session, config, query).await,
                None => Err(AutomationError::UnsupportedSite(url)),
            }
        }
        Intent::AddToCart => saucedemo::add_to_cart(transport, session, config).await,
        Intent::Checkout => saucedemo::checkout(transport, session, config).await,
        Intent::StarResult => github::star_first_result(transport, session, config).await,
        Intent::Unrecognized => Ok(()),
    }
}
