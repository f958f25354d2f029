//! Outbound HTTP to the generative-language endpoint.
//!
//! [`Transport`] is the seam the client is written against; [`ReqwestTransport`]
//! is the production implementation over one shared connection pool.

use std::collections::VecDeque;
use std::mem;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use thiserror::Error;
use tracing::debug;

/// A single outbound POST.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
    /// Whole-request deadline. `None` means no deadline (used for streams).
    pub timeout: Option<Duration>,
}

/// A fully-read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Lines of a response body, read lazily. Dropping it closes the connection.
pub type LineStream = BoxStream<'static, Result<String, TransportError>>;

/// A response whose body is delivered line by line.
pub struct LineResponse {
    pub status: u16,
    pub lines: LineStream,
}

impl std::fmt::Debug for LineResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl LineResponse {
    /// Read the remaining lines into one string, for error reporting.
    ///
    /// Stops at `max_bytes` (cut on a char boundary) or when `deadline`
    /// passes, whichever comes first; whatever was read so far is returned.
    pub async fn collect_body(self, max_bytes: usize, deadline: Duration) -> String {
        let mut lines = self.lines;
        let mut body = String::new();
        let read = async {
            while let Some(Ok(line)) = lines.next().await {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(&line);
                if body.len() >= max_bytes {
                    break;
                }
            }
        };
        if tokio::time::timeout(deadline, read).await.is_err() {
            debug!(read = body.len(), "error body still open at deadline; keeping what arrived");
        }

        if body.len() > max_bytes {
            let mut end = max_bytes;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        body
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS handshake failure.
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    /// The connection broke while sending or reading.
    #[error("i/o error: {0}")]
    Io(String),

    /// The request could not be built (bad URL, bad header).
    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Network-level failures that may succeed on a second attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::Request(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::Request(e.to_string())
        } else {
            TransportError::Io(e.to_string())
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// POST `req.body` as JSON and read the whole response body.
    async fn post_json(&self, req: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// POST `req.body` as JSON and hand back the body as a lazy line stream.
    async fn post_lines(&self, req: TransportRequest) -> Result<LineResponse, TransportError>;
}

/// [`Transport`] over a shared `reqwest::Client`.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, req: TransportRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(&req.url).json(&req.body);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = req.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, req: TransportRequest) -> Result<TransportResponse, TransportError> {
        debug!(url = %req.url, "POST (buffered)");
        let resp = self.build(req).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(TransportResponse { status, body })
    }

    async fn post_lines(&self, req: TransportRequest) -> Result<LineResponse, TransportError> {
        debug!(url = %req.url, "POST (streamed)");
        let resp = self.build(req).send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes_stream().map(|chunk| chunk.map_err(TransportError::from));
        Ok(LineResponse {
            status,
            lines: lines_from_bytes(bytes),
        })
    }
}

/// Splits a byte stream into lines.
///
/// Splitting happens on the byte `\n`, so a multi-byte character cut across
/// two chunks is reassembled before it is decoded. A trailing `\r` is removed.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            let mut line = mem::replace(&mut self.pending, rest);
            line.pop();
            lines.push(decode_line(line));
        }
        lines
    }

    /// Return the unterminated tail, if any. Called once the body has ended.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(decode_line(mem::take(&mut self.pending)))
    }
}

fn decode_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    match String::from_utf8(line) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

struct LineState<S> {
    bytes: S,
    decoder: LineDecoder,
    pending: VecDeque<Result<String, TransportError>>,
    ended: bool,
}

/// Wrap a chunked byte stream into a [`LineStream`].
///
/// A transport error is yielded once and ends the stream.
pub fn lines_from_bytes<S>(bytes: S) -> LineStream
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    let state = LineState {
        bytes: Box::pin(bytes),
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.ended {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.pending.extend(state.decoder.feed(&chunk).into_iter().map(Ok));
                }
                Some(Err(e)) => {
                    state.ended = true;
                    state.pending.push_back(Err(e));
                }
                None => {
                    state.ended = true;
                    state.pending.extend(state.decoder.flush().map(Ok));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn decoder_splits_on_newline_and_strips_cr() {
        let mut d = LineDecoder::new();
        assert_eq!(d.feed(b"data: a\r\ndata: "), vec!["data: a"]);
        assert_eq!(d.feed(b"b\n\n"), vec!["data: b", ""]);
        assert_eq!(d.flush(), None);
    }

    #[test]
    fn decoder_reassembles_split_utf8() {
        let text = "héllo\n".as_bytes();
        let mut d = LineDecoder::new();
        // 'é' is two bytes; cut between them
        assert!(d.feed(&text[..2]).is_empty());
        assert_eq!(d.feed(&text[2..]), vec!["héllo"]);
    }

    #[test]
    fn decoder_flushes_unterminated_tail() {
        let mut d = LineDecoder::new();
        assert!(d.feed(b"{\"text\":\"x\"}").is_empty());
        assert_eq!(d.flush().as_deref(), Some("{\"text\":\"x\"}"));
        assert_eq!(d.flush(), None);
    }

    #[tokio::test]
    async fn line_stream_yields_error_once_then_ends() {
        let chunks = vec![
            Ok(Bytes::from_static(b"one\ntw")),
            Err(TransportError::Io("reset".into())),
            Ok(Bytes::from_static(b"o\n")),
        ];
        let items: Vec<_> = lines_from_bytes(stream::iter(chunks)).collect().await;
        assert_eq!(
            items,
            vec![Ok("one".to_owned()), Err(TransportError::Io("reset".into()))]
        );
    }

    #[test]
    fn only_request_errors_are_permanent() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::Connect("refused".into()).is_transient());
        assert!(TransportError::Io("reset".into()).is_transient());
        assert!(!TransportError::Request("bad url".into()).is_transient());
    }

    #[tokio::test]
    async fn reqwest_transport_posts_json_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/m:generateContent"))
            .and(header("x-goog-api-key", "k"))
            .and(body_json(json!({"contents": []})))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"text\":\"ok\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let resp = transport
            .post_json(TransportRequest {
                url: format!("{}/v1/models/m:generateContent", server.uri()),
                headers: vec![("x-goog-api-key".into(), "k".into())],
                body: json!({"contents": []}),
                timeout: Some(Duration::from_secs(5)),
            })
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "{\"text\":\"ok\"}");
    }

    #[tokio::test]
    async fn reqwest_transport_streams_lines() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("data: {\"text\":\"a\"}\r\n\r\ndata: [DONE]", "text/event-stream"),
            )
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let resp = transport
            .post_lines(TransportRequest {
                url: server.uri(),
                headers: vec![],
                body: json!({}),
                timeout: None,
            })
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        let lines: Vec<String> = resp.lines.map(|l| l.unwrap()).collect().await;
        assert_eq!(lines, vec!["data: {\"text\":\"a\"}", "", "data: [DONE]"]);
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = ReqwestTransport::default()
            .post_json(TransportRequest {
                url: format!("http://{addr}/"),
                headers: vec![],
                body: json!({}),
                timeout: Some(Duration::from_secs(2)),
            })
            .await
            .unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }

    fn line_response(lines: Vec<&'static str>, hang: bool) -> LineResponse {
        let lines = stream::iter(lines.into_iter().map(|l| Ok(l.to_owned())));
        LineResponse {
            status: 500,
            lines: if hang { lines.chain(stream::pending()).boxed() } else { lines.boxed() },
        }
    }

    #[tokio::test]
    async fn error_body_is_capped() {
        let resp = line_response(vec!["0123456789", "abcdef", "never read"], false);
        let body = resp.collect_body(12, Duration::from_secs(5)).await;
        assert_eq!(body, "0123456789\na");

        let resp = line_response(vec!["héllo"], false);
        assert_eq!(resp.collect_body(2, Duration::from_secs(5)).await, "h");
    }

    #[tokio::test]
    async fn error_body_held_open_returns_at_deadline() {
        let resp = line_response(vec!["upstream", "overloaded"], true);
        let body = resp.collect_body(4096, Duration::from_millis(50)).await;
        assert_eq!(body, "upstream\noverloaded");
    }
}
