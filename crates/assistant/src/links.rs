use std::sync::OnceLock;

use {
    marketbot_common::ProductView,
    tracing::{info, warn},
};

/// Public base URL of the bot, used to build webview links in replies.
///
/// Either configured up front, or derived once from the `Host` header of the
/// first webhook delivery. Later deliveries never change it.
#[derive(Debug, Default)]
pub struct PublicUrl {
    root: OnceLock<String>,
}

impl PublicUrl {
    pub fn new(configured: Option<&str>) -> Self {
        let this = Self::default();
        if let Some(url) = configured.map(|u| u.trim().trim_end_matches('/'))
            && !url.is_empty()
        {
            let _ = this.root.set(url.to_string());
        }
        this
    }

    /// Set the root to `https://{host}` unless already known. Returns `true`
    /// when this call initialised it.
    pub fn init_from_host(&self, host: &str) -> bool {
        let host = host.trim();
        if host.is_empty() || self.root.get().is_some() {
            return false;
        }
        let initialised = self.root.set(format!("https://{host}")).is_ok();
        if initialised {
            info!(root = %self.root(), "derived public bot url from host header");
        }
        initialised
    }

    pub fn get(&self) -> Option<&str> {
        self.root.get().map(String::as_str)
    }

    fn root(&self) -> &str {
        self.get().unwrap_or_default()
    }

    /// Link to the product page carrying `view` in its `data` parameter.
    pub fn products_url(&self, view: &ProductView) -> String {
        if self.get().is_none() {
            warn!("public bot url unknown, product link will be relative");
        }
        let base = format!("{}/web/Products", self.root());
        match view.encode() {
            Ok(data) => format!("{base}?data={}", urlencoding::encode(&data)),
            Err(e) => {
                warn!(error = %e, "failed to encode product view");
                base
            },
        }
    }
}
