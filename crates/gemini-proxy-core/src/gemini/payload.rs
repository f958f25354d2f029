//! Request bodies and endpoint URLs for the generative-language API.

use serde::Serialize;

use crate::domain::{Message, Role};

const MODELS_SEGMENT: &str = "/models/";
const GENERATE: &str = ":generateContent";
const STREAM_GENERATE: &str = ":streamGenerateContent";

#[derive(Debug, Serialize, PartialEq)]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
    /// Only sent when the endpoint URL does not already name the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Content<'a> {
    pub role: Role,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Part<'a> {
    pub text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    /// One `contents` entry per history message, in the given order.
    pub fn from_history(history: &'a [Message], model: Option<&'a str>) -> Self {
        Self {
            contents: history
                .iter()
                .map(|m| Content {
                    role: m.role,
                    parts: vec![Part { text: &m.content }],
                })
                .collect(),
            model,
        }
    }
}

/// Where the request for `model` should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    /// `true` when `model` was written into the URL path; otherwise the body
    /// must carry it.
    pub model_in_path: bool,
}

/// Substitute `model` into the `/models/<name>` path segment of `base`.
pub fn endpoint_for(base: &str, model: &str) -> Endpoint {
    let Some(idx) = base.find(MODELS_SEGMENT) else {
        return Endpoint {
            url: base.to_owned(),
            model_in_path: false,
        };
    };
    let start = idx + MODELS_SEGMENT.len();
    let end = base[start..]
        .find([':', '?', '/', '#'])
        .map_or(base.len(), |off| start + off);
    Endpoint {
        url: format!("{}{}{}", &base[..start], model, &base[end..]),
        model_in_path: true,
    }
}

/// Turn a `generateContent` URL into its SSE streaming variant.
pub fn streaming_url(url: &str) -> String {
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (url, None),
    };
    let path = if path.ends_with(GENERATE) {
        format!("{}{}", &path[..path.len() - GENERATE.len()], STREAM_GENERATE)
    } else {
        path.to_owned()
    };
    match query {
        Some(q) if q.split('&').any(|kv| kv.starts_with("alt=")) => format!("{path}?{q}"),
        Some("") | None => format!("{path}?alt=sse"),
        Some(q) => format!("{path}?{q}&alt=sse"),
    }
}
