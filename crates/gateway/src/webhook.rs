//! `/webhook`: the platform's subscription handshake and event delivery.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Query, State},
        http::{HeaderMap, StatusCode, header},
        response::{IntoResponse, Response},
    },
    marketbot_messenger::{WebhookPayload, verify_webhook_subscription},
    secrecy::ExposeSecret,
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::state::AppState;

pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

pub async fn verify_handler(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let challenge = verify_webhook_subscription(
        params.mode.as_deref(),
        params.token.as_deref(),
        params.challenge.as_deref(),
        state.config.messenger.verify_token.expose_secret(),
    );
    match challenge {
        Some(challenge) => {
            info!("WEBHOOK_VERIFIED");
            (StatusCode::OK, challenge).into_response()
        },
        None => {
            warn!(mode = ?params.mode, "webhook verification refused");
            StatusCode::FORBIDDEN.into_response()
        },
    }
}

/// Acknowledge a delivery immediately and handle each entry's first event
/// in its own task.
pub async fn event_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Response {
    if !payload.is_page_subscription() {
        debug!(object = %payload.object, "ignoring non-page webhook");
        return StatusCode::NOT_FOUND.into_response();
    }

    if let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        state.links.init_from_host(host);
    }

    for entry in &payload.entry {
        let Some(event) = entry.first_event() else {
            continue;
        };
        let event = event.clone();
        let dispatcher = Arc::clone(&state.dispatcher);
        tokio::spawn(async move {
            dispatcher.handle(&event).await;
        });
    }

    (StatusCode::OK, EVENT_RECEIVED).into_response()
}
