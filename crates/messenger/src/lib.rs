//! Messenger platform adapter.
//!
//! Inbound webhook payload types and the subscription handshake, reply
//! payload construction, and outbound delivery through the Send API.

pub mod error;
pub mod reply;
pub mod send;
pub mod webhook;

pub use {
    error::{Error, Result},
    reply::{Button, Element, ReplyPayload, TemplatePayload},
    send::{Responder, SendApiClient},
    webhook::{
        Attachment, Entry, EventKind, Message, MessagingEvent, NlpAnnotations, Postback,
        WebhookPayload, verify_webhook_subscription,
    },
};
