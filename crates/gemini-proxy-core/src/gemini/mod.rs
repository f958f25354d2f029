//! Everything that talks to the generative-language API.

pub mod client;
pub mod error;
pub mod extract;
pub mod parser;
pub mod payload;
pub mod transport;

pub use client::{GeminiClient, Generator, RetryPolicy};
pub use error::GenerationError;
pub use parser::{FragmentStream, IncrementalParser};
pub use transport::{ReqwestTransport, Transport, TransportError};
