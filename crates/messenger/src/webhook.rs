//! Messenger webhook payloads and subscription verification.

use std::collections::HashMap;

use {serde::Deserialize, tracing::warn};

/// Body of a `POST /webhook` delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl WebhookPayload {
    pub fn is_page_subscription(&self) -> bool {
        self.object == "page"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub id: Option<String>,
    pub time: Option<u64>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

impl Entry {
    /// The platform delivers one messaging event per entry; later ones are
    /// not expected and are ignored.
    pub fn first_event(&self) -> Option<&MessagingEvent> {
        if self.messaging.len() > 1 {
            warn!(
                entry = ?self.id,
                count = self.messaging.len(),
                "entry carries more than one messaging event, only the first is handled"
            );
        }
        self.messaging.first()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    pub recipient: Option<Participant>,
    pub timestamp: Option<u64>,
    pub message: Option<Message>,
    pub postback: Option<Postback>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub id: String,
}

/// What a messaging event carries. A message wins if both are present.
#[derive(Debug, Clone, Copy)]
pub enum EventKind<'a> {
    Message(&'a Message),
    Postback(&'a Postback),
    Other,
}

impl MessagingEvent {
    pub fn sender_id(&self) -> &str {
        &self.sender.id
    }

    pub fn kind(&self) -> EventKind<'_> {
        match (&self.message, &self.postback) {
            (Some(message), _) => EventKind::Message(message),
            (None, Some(postback)) => EventKind::Postback(postback),
            (None, None) => EventKind::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    pub mid: Option<String>,
    pub text: Option<String>,
    pub nlp: Option<NlpAnnotations>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub attachment_type: String,
    pub payload: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentPayload {
    pub url: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.attachment_type == "image"
    }

    pub fn url(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub title: Option<String>,
    #[serde(default)]
    pub payload: String,
}

/// Built-in NLP annotations attached to a message.
///
/// Two shapes are in the wild: the older `entities.<name>[]` form, where the
/// intent is the `intent` entity, and the newer top-level `intents[]` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NlpAnnotations {
    #[serde(default)]
    pub entities: HashMap<String, Vec<NlpEntity>>,
    #[serde(default)]
    pub intents: Vec<NlpIntent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NlpEntity {
    pub value: serde_json::Value,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NlpIntent {
    pub name: String,
    pub confidence: Option<f64>,
}

impl NlpAnnotations {
    /// Value of the first annotation for `name`, if it clears `min_confidence`.
    pub fn first_entity(&self, name: &str, min_confidence: f64) -> Option<String> {
        let entity = self.entities.get(name)?.first()?;
        if entity.confidence.unwrap_or(1.0) < min_confidence {
            return None;
        }
        match &entity.value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Name of the first recognised intent.
    pub fn first_intent(&self, min_confidence: f64) -> Option<String> {
        if let Some(intent) = self.intents.first() {
            return (intent.confidence.unwrap_or(1.0) >= min_confidence)
                .then(|| intent.name.clone());
        }
        self.first_entity("intent", min_confidence)
    }
}

/// Verify webhook subscription (GET request).
///
/// The platform sends a GET request with:
/// - `hub.mode=subscribe`
/// - `hub.verify_token=<your_verify_token>`
/// - `hub.challenge=<random_string>`
///
/// Returns `Some(challenge)` if verification succeeds.
pub fn verify_webhook_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    let mode = mode?;
    let token = token?;
    let challenge = challenge?;

    if mode == "subscribe" && !verify_token.is_empty() && constant_time_eq(token, verify_token) {
        Some(challenge.to_string())
    } else {
        None
    }
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
