use std::future::Future;
use std::pin::Pin;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Application callback invoked once per parsed request.
///
/// Before the returned future completes the handler must have written one
/// status line, one header block and a body that agrees with those headers
/// (matching `Content-Length`, or a finalized chunked stream). The server
/// does not check this. If the handler fails without writing anything, the
/// client receives a `500 Internal Server Error`.
pub trait Handler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        writer: &'a mut ResponseWriter,
        request: &'a Request,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}
