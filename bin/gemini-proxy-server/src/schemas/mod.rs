//! Request and response bodies of the HTTP API.

pub mod conversation;
pub mod gemini;
