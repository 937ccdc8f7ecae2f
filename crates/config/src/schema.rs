/// Config schema types (server, messenger, nlp, detector, similarity, replies).
use std::{collections::HashMap, path::PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub server: ServerConfig,
    pub messenger: MessengerConfig,
    pub nlp: NlpConfig,
    pub detector: DetectorConfig,
    pub similarity: SimilarityConfig,
    pub bot: BotIdentity,
    pub replies: RepliesConfig,
    pub store: StoreConfig,
    pub web: WebConfig,
    pub http: HttpConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Messenger platform credentials and Send API location.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Page access token passed as `access_token` on every Send API call.
    #[serde(serialize_with = "serialize_secret")]
    pub page_access_token: Secret<String>,

    /// Shared secret echoed back by the platform during the webhook handshake.
    #[serde(serialize_with = "serialize_secret")]
    pub verify_token: Secret<String>,

    /// Graph API base URL. The Send API lives at `{graph_api_url}/me/messages`.
    pub graph_api_url: String,
}

impl std::fmt::Debug for MessengerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessengerConfig")
            .field("page_access_token", &"[REDACTED]")
            .field("verify_token", &"[REDACTED]")
            .field("graph_api_url", &self.graph_api_url)
            .finish()
    }
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            page_access_token: Secret::new(String::new()),
            verify_token: Secret::new(String::new()),
            graph_api_url: "https://graph.facebook.com".into(),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Built-in platform NLP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpConfig {
    /// Trust the `nlp` annotations attached to inbound messages.
    pub enabled: bool,
    /// Annotations below this confidence are ignored.
    pub min_confidence: f64,
}

/// Optional object-detection stage run before similarity lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub enabled: bool,
    /// Key into `endpoints` selecting the active detector.
    pub backend: String,
    /// Detector name -> endpoint URL.
    pub endpoints: HashMap<String, String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: "tensorflow".into(),
            endpoints: HashMap::new(),
        }
    }
}

impl DetectorConfig {
    /// Endpoint of the selected backend, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoints
            .get(&self.backend)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

/// Item-similarity backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Backend base URL, e.g. `https://smbmkt.example.com`.
    pub backend_url: String,
    /// Path of the similarity endpoint on the backend.
    pub path: String,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            path: "/SimilarItems".into(),
        }
    }
}

impl SimilarityConfig {
    pub fn endpoint(&self) -> Option<String> {
        if self.backend_url.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}",
            self.backend_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        ))
    }
}

/// Bot persona and public address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotIdentity {
    /// Name used in personalised greetings ("Hi Milton, ...").
    pub persona_name: String,
    /// Public base URL of this server. When unset it is derived from the
    /// `Host` header of the first webhook delivery.
    pub public_url: Option<String>,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            persona_name: "milton".into(),
            public_url: None,
        }
    }
}

/// User-facing reply texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesConfig {
    pub welcome: String,
    pub goodbye: String,
    pub thank_you: String,
    pub fallback: String,
    pub no_object_detected: String,
    pub image_resolution_error: String,
    pub no_matched_product: String,
    /// Prefix of the text sent back when the Send API rejects a message.
    pub send_error_prefix: String,
    pub view_product_button: String,
    pub view_more_button: String,
    /// Canned replies keyed by intent name (e.g. `InvalidAttachment`).
    pub intents: HashMap<String, String>,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            welcome: "Hi, I am Milton, your marketplace assistant. Send me a photo of a product \
                      and I will find similar items for you."
                .into(),
            goodbye: "Bye! Come back whenever you need something.".into(),
            thank_you: "You're welcome! Happy to help.".into(),
            fallback: "Sorry, I didn't get that. Try sending me a photo of the product you are \
                       looking for."
                .into(),
            no_object_detected: "I couldn't spot a product in this picture. Could you send \
                                 another one?"
                .into(),
            image_resolution_error: "Sorry, I couldn't process this image. Its resolution may \
                                     be too high, please try a smaller one."
                .into(),
            no_matched_product: "Sorry, I couldn't find any matching product.".into(),
            send_error_prefix: "Sorry, something went wrong while replying:".into(),
            view_product_button: "View Product".into(),
            view_more_button: "View More".into(),
            intents: HashMap::from([(
                "InvalidAttachment".to_string(),
                "Sorry, I can only handle pictures for now.".to_string(),
            )]),
        }
    }
}

/// Default location shown on the store page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            latitude: -37.8136,
            longitude: 144.9631,
            address: "Sao Paulo, Brazil".into(),
        }
    }
}

/// Web pages served next to the webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Directory of static assets served under `/web`.
    pub static_dir: Option<PathBuf>,
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}
