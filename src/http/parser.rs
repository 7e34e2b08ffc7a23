//! Incremental request parsing.
//!
//! Bytes are fed through [`Request::parse`] as they arrive. Each call walks
//! the state machine as far as the buffer allows and reports how many bytes
//! it consumed; the caller keeps the rest and passes it again together with
//! the next read.

use bytes::Bytes;

use crate::http::headers::find_separator;
use crate::http::request::{HTTP_VERSION, ParserState, Request, RequestLine};

const SEPARATOR_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed field-line")]
    MalformedFieldLine,
    #[error("malformed field-name")]
    MalformedFieldName,
    #[error("incomplete start-line")]
    IncompleteStartLine,
    #[error("malformed request-line")]
    MalformedRequestLine,
    #[error("request in error state")]
    RequestInErrorState,
    #[error("connection closed before the request was complete")]
    UnexpectedEof,
}

/// Parses the request line at the start of `buf`.
///
/// Returns `Ok(None)` when no complete line is buffered yet, otherwise the
/// line and the number of bytes it occupied including the CRLF.
pub fn parse_request_line(buf: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(idx) = find_separator(buf) else {
        return Ok(None);
    };

    let line = &buf[..idx];

    let parts: Vec<&[u8]> = line.split(|&b| b == b' ').collect();
    let &[method, path, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    if version != HTTP_VERSION.as_bytes() {
        return Err(ParseError::MalformedRequestLine);
    }

    // The path is kept as sent; only the method has to be text
    let method = std::str::from_utf8(method).map_err(|_| ParseError::MalformedRequestLine)?;

    let request_line = RequestLine {
        method: method.to_string(),
        path: Bytes::copy_from_slice(path),
        version: HTTP_VERSION.to_string(),
    };

    Ok(Some((request_line, idx + SEPARATOR_LEN)))
}

impl Request {
    /// Advances the parser over `buf` and returns the bytes consumed.
    ///
    /// Stops when no further progress is possible (a partial line or an
    /// empty buffer) or a terminal state is reached. Any error latches the
    /// request into [`ParserState::Error`].
    pub fn parse(&mut self, buf: &[u8]) -> Result<usize, ParseError> {
        let mut read = 0;

        loop {
            let current = &buf[read..];

            match self.state {
                ParserState::Error => return Err(ParseError::RequestInErrorState),

                ParserState::Init => match parse_request_line(current) {
                    Ok(Some((line, n))) => {
                        self.request_line = line;
                        read += n;
                        self.state = ParserState::Headers;
                    }
                    Ok(None) => break,
                    Err(e) => return Err(self.fail(e)),
                },

                ParserState::Headers => {
                    let (n, complete) = match self.headers.parse(current) {
                        Ok(progress) => progress,
                        Err(e) => return Err(self.fail(e)),
                    };
                    if n == 0 {
                        break;
                    }
                    read += n;

                    if complete {
                        self.state = if self.content_length() > 0 {
                            ParserState::Body
                        } else {
                            ParserState::Done
                        };
                    }
                }

                ParserState::Body => {
                    if current.is_empty() {
                        break;
                    }

                    let wanted = self.content_length().saturating_sub(self.body.len());
                    let take = wanted.min(current.len());
                    self.body.extend_from_slice(&current[..take]);
                    read += take;

                    if self.body.len() >= self.content_length() {
                        self.state = ParserState::Done;
                    }
                }

                ParserState::Done => break,
            }
        }

        Ok(read)
    }

    pub(crate) fn fail(&mut self, err: ParseError) -> ParseError {
        self.state = ParserState::Error;
        err
    }
}
