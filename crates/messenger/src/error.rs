use std::error::Error as StdError;

/// Crate-wide result type for Messenger operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for Send API delivery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reply had nothing to send.
    #[error("refusing to send an empty reply")]
    EmptyPayload,

    /// Network or HTTP-level failure before a response was read.
    #[error("send api request failed: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The platform answered with an error object.
    #[error("send api rejected message ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Non-success status without a readable error object.
    #[error("send api returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl Error {
    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Message the platform attached to its error response, if any.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            Self::Provider { message, .. } => Some(message),
            _ => None,
        }
    }
}
