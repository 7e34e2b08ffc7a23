use std::borrow::Cow;

use bytes::Bytes;

use crate::http::headers::HeaderMap;

pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Progress of a [`Request`] through the incremental parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the request line
    Init,
    /// Reading header field lines
    Headers,
    /// Accumulating `Content-Length` bytes of body
    Body,
    /// Request fully parsed
    Done,
    /// Parsing failed; the request accepts no further input
    Error,
}

/// The first line of a request: method, target path and protocol version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    /// Request method token (e.g. "GET")
    pub method: String,
    /// Request target bytes exactly as sent by the client (e.g. "/index.html")
    pub path: Bytes,
    /// Always "HTTP/1.1" once parsed
    pub version: String,
}

/// An HTTP request being assembled from raw connection bytes.
///
/// A single `Request` is threaded through every partial parse of one
/// connection's input; see [`Request::parse`].
#[derive(Debug, Clone)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub(crate) state: ParserState,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Creates an empty request in [`ParserState::Init`].
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            state: ParserState::Init,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True once parsing reached a terminal state, successful or not.
    pub fn is_done(&self) -> bool {
        matches!(self.state, ParserState::Done | ParserState::Error)
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    /// The request target as text. Bytes that are not UTF-8 show up as
    /// U+FFFD here; [`path_bytes`](Self::path_bytes) has the original.
    pub fn path(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.request_line.path)
    }

    pub fn path_bytes(&self) -> &[u8] {
        &self.request_line.path
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// The `Content-Length` header as a number.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}
