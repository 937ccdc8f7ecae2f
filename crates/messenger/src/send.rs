//! Outbound delivery through the Send API.

use std::borrow::Cow;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    reply::ReplyPayload,
};

/// Upper bound on Send API calls for one reply: the original message plus a
/// single re-send that reports the provider error to the user.
const MAX_ATTEMPTS: u32 = 2;

/// Sends a reply to a conversation.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, recipient: &str, payload: &ReplyPayload) -> Result<()>;
}

/// [`Responder`] backed by the Graph API `me/messages` endpoint.
pub struct SendApiClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Secret<String>,
    error_prefix: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl SendApiClient {
    pub fn new(
        http: reqwest::Client,
        graph_api_url: &str,
        access_token: Secret<String>,
        error_prefix: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/me/messages", graph_api_url.trim_end_matches('/')),
            access_token,
            error_prefix: error_prefix.into(),
        }
    }

    async fn post(&self, recipient: &str, payload: &ReplyPayload) -> Result<()> {
        let body = serde_json::json!({
            "recipient": { "id": recipient },
            "message": payload,
        });
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("access_token", self.access_token.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::transport("POST me/messages", e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "send api error response");
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty());
        Err(match message {
            Some(message) => Error::Provider {
                status: status.as_u16(),
                message,
            },
            None => Error::Status {
                status: status.as_u16(),
                body,
            },
        })
    }
}

#[async_trait]
impl Responder for SendApiClient {
    async fn send(&self, recipient: &str, payload: &ReplyPayload) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let mut payload = Cow::Borrowed(payload);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.post(recipient, &payload).await {
                Ok(()) => {
                    info!(recipient, attempt, "message sent");
                    return Ok(());
                },
                Err(e) => e,
            };
            warn!(recipient, attempt, error = %err, "unable to send message");

            let report = match err.provider_message() {
                Some(message) if attempt < MAX_ATTEMPTS => {
                    Some(format!("{} {message}", self.error_prefix))
                },
                _ => None,
            };
            match report {
                Some(text) => payload = Cow::Owned(ReplyPayload::text(text)),
                None => return Err(err),
            }
        }
    }
}
