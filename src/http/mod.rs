//! HTTP/1.1 protocol implementation.
//!
//! # Architecture
//!
//! - **`headers`**: case-insensitive header map and the field-line parser
//! - **`request`**: request types and parser state
//! - **`parser`**: the incremental request state machine
//! - **`response`**: status table and default header sets
//! - **`writer`**: streams a response, optionally with chunked framing
//! - **`connection`**: per-connection read / dispatch / close driver
//!
//! # Parser State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Init     │ ← Wait for "METHOD SP PATH SP HTTP/1.1 CRLF"
//!        └──────┬──────┘
//!               │ Request line parsed
//!               ▼
//!        ┌─────────────┐
//!        │   Headers   │ ← Field lines until a bare CRLF
//!        └──────┬──────┘
//!               ├─ Content-Length > 0 → Body → Done
//!               └─ otherwise → Done
//!
//!   Any malformed input → Error (terminal, further parses fail)
//! ```
//!
//! # Example
//!
//! ```
//! use rawhttp::http::request::{ParserState, Request};
//!
//! let mut req = Request::new();
//! let n = req.parse(b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//!
//! assert_eq!(n, 42);
//! assert_eq!(req.state(), ParserState::Done);
//! assert_eq!(req.header("HOST"), Some("example.com"));
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
