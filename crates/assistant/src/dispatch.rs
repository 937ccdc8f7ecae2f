//! Per-event routing: every inbound messaging event ends in at most one
//! reply per message (one per attachment for attachment messages).

use std::sync::Arc;

use {
    marketbot_common::ProductMatch,
    marketbot_config::{BotConfig, RepliesConfig},
    marketbot_messenger::{
        EventKind, Message, MessagingEvent, NlpAnnotations, Postback, ReplyPayload, Responder,
    },
    tracing::{debug, info, warn},
};

use crate::{
    cart::demo_cart,
    image::ImagePipeline,
    intent::{Intent, IntentClassifier},
    links::PublicUrl,
};

const GET_STARTED: &str = "Get Started";

pub struct Dispatcher {
    classifier: IntentClassifier,
    pipeline: ImagePipeline,
    responder: Arc<dyn Responder>,
    replies: RepliesConfig,
    cart: Vec<ProductMatch>,
}

impl Dispatcher {
    pub fn new(
        classifier: IntentClassifier,
        pipeline: ImagePipeline,
        responder: Arc<dyn Responder>,
        replies: RepliesConfig,
    ) -> Self {
        Self {
            classifier,
            pipeline,
            responder,
            replies,
            cart: demo_cart(),
        }
    }

    pub fn from_config(
        config: &BotConfig,
        http: reqwest::Client,
        responder: Arc<dyn Responder>,
        links: Arc<PublicUrl>,
    ) -> Self {
        Self::new(
            IntentClassifier::from_config(config),
            ImagePipeline::from_config(config, http, links),
            responder,
            config.replies.clone(),
        )
    }

    pub async fn handle(&self, event: &MessagingEvent) {
        let sender = event.sender_id();
        match event.kind() {
            EventKind::Message(message) => self.handle_message(sender, message).await,
            EventKind::Postback(postback) => self.handle_postback(sender, postback).await,
            EventKind::Other => debug!(sender, "ignoring event without message or postback"),
        }
    }

    async fn handle_message(&self, sender: &str, message: &Message) {
        if message.has_attachments() {
            for attachment in &message.attachments {
                let reply = match attachment.url() {
                    Some(url) if attachment.is_image() => {
                        info!(sender, url, "image attachment received");
                        self.pipeline.process(url).await
                    },
                    _ => {
                        info!(sender, kind = %attachment.attachment_type, "unsupported attachment");
                        self.canned_or_fallback(Intent::InvalidAttachment)
                    },
                };
                self.send(sender, &reply).await;
            }
            return;
        }

        let Some(text) = message.text.as_deref() else {
            debug!(sender, "message without text or attachments");
            return;
        };
        let reply = self.reply_to_text(text, message.nlp.as_ref());
        self.send(sender, &reply).await;
    }

    /// Reply for a text message.
    pub fn reply_to_text(&self, text: &str, nlp: Option<&NlpAnnotations>) -> ReplyPayload {
        if let Some(intent) = self.classifier.nlp_intent(nlp) {
            info!(%intent, "intent by platform nlp");
            if let Some(reply) = self.classifier.reply_for(intent) {
                return ReplyPayload::text(reply);
            }
        }

        let intent = self.classifier.classify(text, nlp);
        debug!(intent = ?intent, "classified message");
        match intent {
            Some(Intent::Greeting) => ReplyPayload::text(&self.replies.welcome),
            Some(Intent::GoodBye) => ReplyPayload::text(&self.replies.goodbye),
            Some(Intent::ThankYou) => ReplyPayload::text(&self.replies.thank_you),
            Some(Intent::ShowCart) => self.pipeline.cards().list(self.cart.clone()),
            Some(Intent::InvalidAttachment) => self.canned_or_fallback(Intent::InvalidAttachment),
            None => ReplyPayload::text(&self.replies.fallback),
        }
    }

    async fn handle_postback(&self, sender: &str, postback: &Postback) {
        if postback.payload == GET_STARTED {
            info!(sender, "Get Started");
        } else {
            info!(sender, payload = %postback.payload, "postback received");
        }
        self.send(sender, &ReplyPayload::text(&self.replies.welcome))
            .await;
    }

    fn canned_or_fallback(&self, intent: Intent) -> ReplyPayload {
        ReplyPayload::text(
            self.classifier
                .reply_for(intent)
                .unwrap_or(&self.replies.fallback),
        )
    }

    async fn send(&self, sender: &str, reply: &ReplyPayload) {
        if let Err(e) = self.responder.send(sender, reply).await {
            warn!(sender, error = %e, "reply not delivered");
        }
    }
}
