//! TCP server: accept loop, request handlers and shutdown.

pub mod handler;
pub mod listener;

pub use handler::{BoxFuture, Handler};
pub use listener::Server;
