use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tracing::{debug, error, warn};

use crate::http::parser::ParseError;
use crate::http::request::{ParserState, Request};
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::{ResponseWriter, WriteError};
use crate::server::Handler;

const READ_BUFFER_SIZE: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads one request from `reader`, feeding bytes to the parser as they
/// arrive until it reaches a terminal state.
///
/// Unconsumed bytes (a partial line or partial body) stay buffered and are
/// passed again after the next read.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut request = Request::new();
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);

    while !request.is_done() {
        buffer.reserve(READ_BUFFER_SIZE);
        let n = reader.read_buf(&mut buffer).await?;

        if n == 0 {
            // Peer closed before the request was complete
            let err = match request.state() {
                ParserState::Init => ParseError::IncompleteStartLine,
                _ => ParseError::UnexpectedEof,
            };
            return Err(request.fail(err).into());
        }

        let consumed = request.parse(&buffer)?;
        buffer.advance(consumed);
    }

    Ok(request)
}

/// Drives a single accepted connection: read one request, answer it, close.
pub struct Connection {
    writer: ResponseWriter<TcpStream>,
    peer: SocketAddr,
    handler: Arc<dyn Handler>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Rejecting(ReadError),
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, handler: Arc<dyn Handler>) -> Self {
        Self {
            writer: ResponseWriter::new(stream),
            peer,
            handler,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match read_request(self.writer.get_mut()).await {
                        Ok(req) => ConnectionState::Processing(req),
                        Err(e) => ConnectionState::Rejecting(e),
                    };
                }

                ConnectionState::Processing(req) => {
                    debug!(
                        peer = %self.peer,
                        method = req.method(),
                        path = %req.path(),
                        body_len = req.body.len(),
                        "Dispatching request"
                    );

                    if let Err(e) = self.handler.handle(&mut self.writer, &req).await {
                        error!(
                            peer = %self.peer,
                            path = %req.path(),
                            error = %e,
                            "Handler failed"
                        );
                        if !self.writer.has_started() {
                            self.respond_empty(StatusCode::InternalServerError).await?;
                        }
                    }
                }

                ConnectionState::Rejecting(e) => {
                    warn!(peer = %self.peer, error = %e, "Rejecting request");
                    self.respond_empty(StatusCode::BadRequest).await?;
                }

                ConnectionState::Closed => {
                    if let Err(e) = self.writer.shutdown().await {
                        debug!(peer = %self.peer, error = %e, "Shutdown after response failed");
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    async fn respond_empty(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.writer.write_status_line(status).await?;
        self.writer.write_headers(&default_headers(0)).await
    }
}
