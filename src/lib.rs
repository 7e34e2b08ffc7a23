//! rawhttp - HTTP/1.1 server on raw TCP streams
//!
//! Incremental request parsing, a streaming response writer with chunked
//! transfer encoding, and a task-per-connection server.

pub mod config;
pub mod http;
pub mod routes;
pub mod server;
