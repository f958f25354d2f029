//! Core error taxonomy.
//!
//! The HTTP layer maps each variant onto a status class; see
//! `gemini-proxy-server`'s `ServerError`.

use thiserror::Error;

use crate::gemini::GenerationError;

/// Every failure the core services can report to a caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad, oversized or unsafe input. Raised before any store or upstream call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The upstream endpoint is not configured. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network-level failure talking to the upstream after retries were exhausted.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamRejected {
        status: u16,
        body: String,
        /// Remediation advice, set for credential failures.
        hint: Option<String>,
    },

    /// The upstream answered 2xx with a body we could not interpret.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// The non-streaming call exceeded its deadline.
    #[error("upstream timed out after {0} seconds")]
    UpstreamTimeout(u64),

    /// The referenced conversation or message does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Message/conversation store failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl CoreError {
    /// `true` for the failures that the HTTP layer reports as Bad Gateway.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            CoreError::UpstreamUnavailable(_)
                | CoreError::UpstreamRejected { .. }
                | CoreError::InvalidResponse(_)
        )
    }
}

impl From<GenerationError> for CoreError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Configuration(m) => CoreError::Configuration(m),
            GenerationError::Unavailable(m) => CoreError::UpstreamUnavailable(m),
            GenerationError::Rejected { status, body, hint } => {
                CoreError::UpstreamRejected { status, body, hint }
            }
            GenerationError::InvalidResponse(m) => CoreError::InvalidResponse(m),
        }
    }
}
