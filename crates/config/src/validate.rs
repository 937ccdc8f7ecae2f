//! Checks that the settings the bot cannot work without are present.

use secrecy::ExposeSecret;

use crate::schema::BotConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "messenger.verify_token"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a fully loaded configuration (file + env overrides).
pub fn validate(config: &BotConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.messenger.page_access_token.expose_secret().is_empty() {
        result.push(
            Severity::Error,
            "messenger.page_access_token",
            "page access token is not set (PAGE_ACCESS_TOKEN)",
        );
    }
    if config.messenger.verify_token.expose_secret().is_empty() {
        result.push(
            Severity::Error,
            "messenger.verify_token",
            "webhook verify token is not set (VERIFY_TOKEN)",
        );
    }
    if config.similarity.endpoint().is_none() {
        result.push(
            Severity::Error,
            "similarity.backend_url",
            "item similarity backend is not set (SMBMKT_BACKEND_URL)",
        );
    }
    if config.detector.enabled && config.detector.endpoint().is_none() {
        result.push(
            Severity::Error,
            "detector.endpoints",
            format!(
                "detector '{}' is enabled but has no endpoint (IMAGE_PRE_PROCESS_URL)",
                config.detector.backend
            ),
        );
    }
    if let Some(url) = config.bot.public_url.as_deref()
        && !url.starts_with("https://")
    {
        result.push(
            Severity::Warning,
            "bot.public_url",
            "Messenger only opens https:// button URLs",
        );
    }
    if !(0.0..=1.0).contains(&config.nlp.min_confidence) {
        result.push(
            Severity::Warning,
            "nlp.min_confidence",
            "confidence threshold should be between 0 and 1",
        );
    }

    result
}
