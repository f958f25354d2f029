//! gemini-proxy-core – the conversation and generation pipeline behind
//! `gemini-proxy-server`.
//!
//! Layering (leaf first):
//!
//! 1. [`gemini::transport`] – outbound HTTP (shared `reqwest` pool).
//! 2. [`gemini::parser`] – turns the upstream body into text fragments,
//!    whatever the framing (SSE, NDJSON, or one JSON document split across reads).
//! 3. [`gemini::client`] – `generate` / `stream_generate` on top of 1 and 2.
//! 4. [`services::chat`] – validates, loads history, relays fragments and
//!    persists the reply through the [`entities`] stores.

pub mod config;
pub mod domain;
pub mod entities;
pub mod error;
pub mod gemini;
pub mod services;

pub use config::GeminiConfig;
pub use error::CoreError;
