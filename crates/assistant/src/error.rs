use std::error::Error as StdError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the detector or similarity backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend is not configured.
    #[error("{service} is not configured")]
    Unavailable { service: &'static str },

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
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
}
