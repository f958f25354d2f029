//! Incremental response parser.
//!
//! Turns the lines of an upstream body into text fragments without knowing in
//! advance whether the upstream speaks SSE (`data: {...}`), NDJSON, or streams
//! one large JSON array across many lines.
//!
//! Every payload is appended to a rolling buffer and the unconsumed part of the
//! buffer is scanned for `"text": "<json string>"` pairs. This finds text in all
//! three framings, including objects split across lines. Two shapes are not
//! handled: a raw newline inside a `"text"` value, and the literal `"text":`
//! appearing inside some other string value.

use std::collections::VecDeque;
use std::sync::LazyLock;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use regex::Regex;
use serde_json::Value;

use super::error::GenerationError;
use super::extract::extract_texts;
use super::transport::LineStream;
use crate::domain::Fragment;

static TEXT_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""text"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid text-field regex")
});

const DONE: &str = "[DONE]";

/// Fragments of one generation, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<Fragment, GenerationError>>;

/// One parser per upstream response.
#[derive(Debug, Default)]
pub struct IncrementalParser {
    buffer: String,
    /// Byte offset into `buffer`; everything before it has been scanned.
    processed: usize,
    done: bool,
}

impl IncrementalParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once `[DONE]` was seen; later lines are ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one line (without its terminator) and return the fragments it completed.
    pub fn feed_line(&mut self, line: &str) -> Vec<Fragment> {
        if self.done {
            return Vec::new();
        }
        let Some(payload) = payload_of(line) else {
            return Vec::new();
        };
        if payload == DONE {
            self.done = true;
            return Vec::new();
        }

        self.buffer.push_str(payload);
        self.buffer.push('\n');

        let mut out = self.scan();
        if out.is_empty() {
            if let Ok(doc) = serde_json::from_str::<Value>(payload) {
                out = extract_texts(&doc);
                self.processed = self.buffer.len();
            }
        }
        self.compact();
        out
    }

    fn scan(&mut self) -> Vec<Fragment> {
        let mut out = Vec::new();
        let mut consumed = 0;
        for caps in TEXT_FIELD_RE.captures_iter(&self.buffer[self.processed..]) {
            if let Some(whole) = caps.get(0) {
                consumed = whole.end();
            }
            match caps.get(1).map(|raw| unescape(raw.as_str())) {
                Some(Some(text)) if !text.is_empty() => out.push(text),
                Some(None) => tracing::debug!("skipping text field that is not a valid JSON string"),
                _ => {}
            }
        }
        self.processed += consumed;
        out
    }

    /// Drop the scanned prefix once it is the larger half of the buffer.
    fn compact(&mut self) {
        if self.processed > self.buffer.len() / 2 {
            self.buffer.drain(..self.processed);
            self.processed = 0;
        }
    }

    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Strip framing. `None` for lines that carry no payload.
fn payload_of(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => line,
    };
    (!payload.is_empty()).then_some(payload)
}

fn unescape(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).ok()
}

struct RelayState {
    lines: LineStream,
    parser: IncrementalParser,
    pending: VecDeque<Fragment>,
    ended: bool,
}

/// Lazily parse `lines` into fragments.
///
/// A transport error is yielded once as [`GenerationError::Unavailable`] and
/// ends the stream. `[DONE]` ends it immediately, dropping `lines`.
pub fn fragments(lines: LineStream) -> FragmentStream {
    let state = RelayState {
        lines,
        parser: IncrementalParser::new(),
        pending: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.ended || state.parser.is_done() {
                return None;
            }
            match state.lines.next().await {
                Some(Ok(line)) => state.pending.extend(state.parser.feed_line(&line)),
                Some(Err(e)) => {
                    state.ended = true;
                    return Some((Err(GenerationError::from(e)), state));
                }
                None => state.ended = true,
            }
        }
    })
    .boxed()
}
