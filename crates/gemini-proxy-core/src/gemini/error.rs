use thiserror::Error;

use super::transport::TransportError;

/// Advice attached to 401 responses.
pub const UNAUTHORIZED_HINT: &str = "Request had invalid authentication credentials. \
Set GEMINI_API_KEY to a valid API key and make sure the endpoint accepts API-key authentication.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// No upstream URL configured; nothing was sent.
    #[error("{0}")]
    Configuration(String),

    /// Network failure, after retries where they apply.
    #[error("request error while calling the generation API: {0}")]
    Unavailable(String),

    #[error("generation API returned HTTP {status}: {body}")]
    Rejected {
        status: u16,
        body: String,
        hint: Option<String>,
    },

    /// 2xx with a body that is not JSON.
    #[error("generation API returned an unreadable body: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    pub(crate) fn rejected(status: u16, body: String) -> Self {
        let hint = (status == 401).then(|| UNAUTHORIZED_HINT.to_owned());
        GenerationError::Rejected { status, body, hint }
    }
}

impl From<TransportError> for GenerationError {
    fn from(e: TransportError) -> Self {
        GenerationError::Unavailable(e.to_string())
    }
}
