use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::http::headers::HeaderMap;
use crate::http::request::HTTP_VERSION;
use crate::http::response::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("unrecognized status code {0}")]
    UnknownStatus(u16),
    #[error("chunked encoding not enabled")]
    ChunkedNotEnabled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Writes one HTTP response onto an output stream.
///
/// Bytes go straight to the underlying stream, so a handler can stream a
/// body piece by piece. Once [`enable_chunked_encoding`](Self::enable_chunked_encoding)
/// is called every body write is framed as a chunk.
pub struct ResponseWriter<W = TcpStream> {
    stream: W,
    chunked: bool,
    started: bool,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            chunked: false,
            started: false,
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// True once any byte of the response has been handed to the stream.
    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.stream
    }

    pub fn into_inner(self) -> W {
        self.stream
    }

    async fn write_raw(&mut self, buf: &[u8]) -> Result<(), WriteError> {
        self.started = true;
        self.stream.write_all(buf).await?;
        Ok(())
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        let line = format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        self.write_raw(line.as_bytes()).await
    }

    /// Writes the status line for a numeric code. Nothing is written when
    /// the code is not in the status table.
    pub async fn write_status_code(&mut self, code: u16) -> Result<(), WriteError> {
        let status = StatusCode::from_u16(code).ok_or(WriteError::UnknownStatus(code))?;
        self.write_status_line(status).await
    }

    /// Writes every header in map order followed by the blank line that
    /// ends the header section.
    pub async fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), WriteError> {
        let mut buf = Vec::new();
        for (name, value) in headers.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");

        self.write_raw(&buf).await
    }

    /// Switches the body to chunked framing and fixes up `headers` to match.
    pub fn enable_chunked_encoding(&mut self, headers: &mut HeaderMap) {
        self.chunked = true;
        headers.replace("Transfer-Encoding", "chunked");
        headers.remove("Content-Length");
    }

    /// Writes body bytes, as a chunk frame when chunked encoding is on.
    ///
    /// Returns the number of payload bytes written.
    pub async fn write_body(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.chunked {
            return self.write_chunk(data).await;
        }
        self.write_raw(data).await?;
        Ok(data.len())
    }

    /// Writes `data` as one `<hex-len>\r\n<data>\r\n` frame. Empty input
    /// writes nothing, since a zero-length chunk would end the stream.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut frame = Vec::with_capacity(data.len() + 20);
        frame.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
        frame.extend_from_slice(data);
        frame.extend_from_slice(b"\r\n");

        self.write_raw(&frame).await?;
        Ok(data.len())
    }

    /// Writes the terminating zero-length chunk.
    pub async fn finalize_chunked_encoding(&mut self) -> Result<(), WriteError> {
        if !self.chunked {
            return Err(WriteError::ChunkedNotEnabled);
        }
        self.write_raw(b"0\r\n\r\n").await
    }

    /// Flushes and shuts down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<(), WriteError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
