use std::{sync::Arc, time::Duration};

use {
    marketbot_assistant::{Dispatcher, PublicUrl},
    marketbot_config::BotConfig,
    marketbot_messenger::{Responder, SendApiClient},
};

use crate::error::{Context, Result};

/// Shared, read-only state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BotConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub links: Arc<PublicUrl>,
    pub version: &'static str,
}

impl AppState {
    /// Wire the production graph: one HTTP client shared by the Send API,
    /// detector and similarity calls.
    pub fn from_config(config: BotConfig) -> Result<Self> {
        let http = http_client(&config)?;
        let responder = Arc::new(SendApiClient::new(
            http.clone(),
            &config.messenger.graph_api_url,
            config.messenger.page_access_token.clone(),
            config.replies.send_error_prefix.clone(),
        ));
        Ok(Self::with_responder(config, http, responder))
    }

    /// Same as [`AppState::from_config`] with a caller-provided responder.
    pub fn with_responder(
        config: BotConfig,
        http: reqwest::Client,
        responder: Arc<dyn Responder>,
    ) -> Self {
        let links = Arc::new(PublicUrl::new(config.bot.public_url.as_deref()));
        let dispatcher = Dispatcher::from_config(&config, http, responder, Arc::clone(&links));
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            links,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

pub fn http_client(config: &BotConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build http client")
}
