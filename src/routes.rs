//! Demo routes served by the `rawhttp` binary.
//!
//! - `/`: static welcome page
//! - `/bad-request`, `/server-error`: fixed error pages
//! - `/logs`: streams `server.log` from the sample directory as chunks
//! - `/video`: streams `video.mp4` from the sample directory as chunks
//! - anything else: `404 Not Found`

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers, default_headers_chunked};
use crate::http::writer::ResponseWriter;
use crate::server::{BoxFuture, Handler};

const LOG_CHUNK_SIZE: usize = 1024;
const VIDEO_CHUNK_SIZE: usize = 64 * 1024;

pub struct Routes {
    sample_dir: PathBuf,
    log_delay: Duration,
}

impl Routes {
    pub fn new(sample_dir: impl AsRef<Path>) -> Self {
        Self {
            sample_dir: sample_dir.as_ref().to_path_buf(),
            log_delay: Duration::from_millis(500),
        }
    }

    /// Pause between log chunks, to make the streaming visible in a browser.
    pub fn with_log_delay(mut self, delay: Duration) -> Self {
        self.log_delay = delay;
        self
    }

    async fn route(&self, w: &mut ResponseWriter, req: &Request) -> anyhow::Result<()> {
        match &*req.path() {
            "/" => html(w, StatusCode::Ok, "<h1>Welcome to rawhttp</h1>").await,
            "/bad-request" => html(w, StatusCode::BadRequest, "<h1>400 Bad Request</h1>").await,
            "/server-error" => {
                html(
                    w,
                    StatusCode::InternalServerError,
                    "<h1>500 Internal Server Error</h1>",
                )
                .await
            }
            "/logs" => self.stream_logs(w).await,
            "/video" => self.stream_video(w).await,
            _ => html(w, StatusCode::NotFound, "<h1>404 Not Found</h1>").await,
        }
    }

    async fn stream_logs(&self, w: &mut ResponseWriter) -> anyhow::Result<()> {
        let mut headers = default_headers_chunked();
        w.enable_chunked_encoding(&mut headers);
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&headers).await?;

        let path = self.sample_dir.join("server.log");
        let mut file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot open log file");
                w.write_chunk(b"Error opening log file\n").await?;
                w.finalize_chunked_encoding().await?;
                return Ok(());
            }
        };

        let mut buf = vec![0u8; LOG_CHUNK_SIZE];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if !self.log_delay.is_zero() {
                        tokio::time::sleep(self.log_delay).await;
                    }
                    w.write_chunk(&buf[..n]).await?;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Log read failed");
                    w.write_chunk(b"Error reading file\n").await?;
                    break;
                }
            }
        }

        w.finalize_chunked_encoding().await?;
        Ok(())
    }

    async fn stream_video(&self, w: &mut ResponseWriter) -> anyhow::Result<()> {
        let path = self.sample_dir.join("video.mp4");
        let mut file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot open video file");
                w.write_status_line(StatusCode::InternalServerError).await?;
                w.write_headers(&default_headers(0)).await?;
                return Ok(());
            }
        };

        let mut headers = default_headers_chunked();
        headers.replace("Content-Type", "video/mp4");
        w.enable_chunked_encoding(&mut headers);
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&headers).await?;

        let mut buf = vec![0u8; VIDEO_CHUNK_SIZE];
        loop {
            let n = match file.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Video read failed");
                    break;
                }
            };
            if n == 0 {
                break;
            }
            w.write_chunk(&buf[..n]).await?;
        }

        w.finalize_chunked_encoding().await?;
        Ok(())
    }
}

impl Handler for Routes {
    fn handle<'a>(
        &'a self,
        writer: &'a mut ResponseWriter,
        request: &'a Request,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.route(writer, request))
    }
}

async fn html(w: &mut ResponseWriter, status: StatusCode, body: &str) -> anyhow::Result<()> {
    let mut headers = default_headers(body.len());
    headers.replace("Content-Type", "text/html");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(body.as_bytes()).await?;
    Ok(())
}
