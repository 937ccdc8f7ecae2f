//! Intent classification from message text and platform NLP annotations.
//!
//! Keyword rules are plain substring tests on lower-cased text, checked in a
//! fixed priority order: greeting, goodbye, thanks, show-cart.

use std::{collections::HashMap, str::FromStr};

use {
    marketbot_config::BotConfig,
    marketbot_messenger::NlpAnnotations,
    tracing::{debug, warn},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    GoodBye,
    ThankYou,
    ShowCart,
    InvalidAttachment,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "Greeting",
            Self::GoodBye => "GoodBye",
            Self::ThankYou => "ThankYou",
            Self::ShowCart => "ShowCart",
            Self::InvalidAttachment => "InvalidAttachment",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIntent(pub String);

impl std::fmt::Display for UnknownIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown intent: {}", self.0)
    }
}

impl std::error::Error for UnknownIntent {}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greeting" | "greetings" => Ok(Self::Greeting),
            "goodbye" => Ok(Self::GoodBye),
            "thankyou" => Ok(Self::ThankYou),
            "showcart" => Ok(Self::ShowCart),
            "invalidattachment" => Ok(Self::InvalidAttachment),
            _ => Err(UnknownIntent(s.to_string())),
        }
    }
}

/// Greeting keywords that are ignored when the user addresses the bot by
/// name right after them ("hello milton, ..."), which is how users answer a
/// personalised greeting.
const ADDRESSABLE_GREETINGS: &[&str] = &["hey", "hello", "ola", "olá", "ciao"];
const BYE_EXACT: &[&str] = &["bye", "bye bye", "good bye"];
const THANKS: &[&str] = &["thank", "gracia"];

pub struct IntentClassifier {
    nlp_enabled: bool,
    min_confidence: f64,
    persona: String,
    canned: HashMap<Intent, String>,
}

impl IntentClassifier {
    pub fn new(
        nlp_enabled: bool,
        min_confidence: f64,
        persona: &str,
        canned: HashMap<Intent, String>,
    ) -> Self {
        Self {
            nlp_enabled,
            min_confidence,
            persona: persona.trim().to_lowercase(),
            canned,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        let canned = config
            .replies
            .intents
            .iter()
            .filter_map(|(name, reply)| match name.parse::<Intent>() {
                Ok(intent) => Some((intent, reply.clone())),
                Err(e) => {
                    warn!(error = %e, "ignoring canned reply");
                    None
                },
            })
            .collect();
        Self::new(
            config.nlp.enabled,
            config.nlp.min_confidence,
            &config.bot.persona_name,
            canned,
        )
    }

    /// Intent named by the platform NLP, when NLP is enabled.
    pub fn nlp_intent(&self, nlp: Option<&NlpAnnotations>) -> Option<Intent> {
        if !self.nlp_enabled {
            return None;
        }
        let name = nlp?.first_intent(self.min_confidence)?;
        match name.parse() {
            Ok(intent) => Some(intent),
            Err(e) => {
                debug!(error = %e, "nlp intent not handled");
                None
            },
        }
    }

    /// Canned reply configured for `intent`.
    pub fn reply_for(&self, intent: Intent) -> Option<&str> {
        self.canned
            .get(&intent)
            .map(String::as_str)
            .filter(|r| !r.is_empty())
    }

    /// Rule-based classification, with NLP hints where enabled.
    pub fn classify(&self, text: &str, nlp: Option<&NlpAnnotations>) -> Option<Intent> {
        let text = text.to_lowercase();
        let nlp_intent = self.nlp_intent(nlp);
        let greeting_entity = nlp
            .and_then(|n| n.first_entity("greetings", self.min_confidence))
            .is_some_and(|v| v == "true");

        if greeting_entity || self.is_greeting(&text) {
            Some(Intent::Greeting)
        } else if nlp_intent == Some(Intent::GoodBye) || is_bye(&text) {
            Some(Intent::GoodBye)
        } else if nlp_intent == Some(Intent::ThankYou) || is_thanks(&text) {
            Some(Intent::ThankYou)
        } else if nlp_intent == Some(Intent::ShowCart) {
            Some(Intent::ShowCart)
        } else {
            None
        }
    }

    /// Greeting keyword test on lower-cased text.
    pub fn is_greeting(&self, text: &str) -> bool {
        let addressed = |keyword: &str| text.contains(&format!("{keyword} {},", self.persona));

        if text == "hi" || (has_token(text, "hi") && !addressed("hi")) {
            return true;
        }
        ADDRESSABLE_GREETINGS
            .iter()
            .any(|kw| text.contains(kw) && !addressed(kw))
            || text.contains("greeting")
    }
}

pub fn is_bye(text: &str) -> bool {
    BYE_EXACT.contains(&text) || text.contains("bye")
}

pub fn is_thanks(text: &str) -> bool {
    THANKS.iter().any(|kw| text.contains(kw))
}

fn has_token(text: &str, token: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|t| t == token)
}
