use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rawhttp::http::request::Request;
use rawhttp::http::response::{StatusCode, default_headers};
use rawhttp::http::writer::ResponseWriter;
use rawhttp::routes::Routes;
use rawhttp::server::{BoxFuture, Handler, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Echoes the request body back with the method and path in headers.
struct Echo;

impl Handler for Echo {
    fn handle<'a>(
        &'a self,
        writer: &'a mut ResponseWriter,
        request: &'a Request,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let mut headers = default_headers(request.body.len());
            headers.replace("X-Method", request.method());
            headers.replace("X-Path", &request.path());

            writer.write_status_line(StatusCode::Ok).await?;
            writer.write_headers(&headers).await?;
            writer.write_body(&request.body).await?;
            Ok::<_, anyhow::Error>(())
        })
    }
}

/// Fails without writing anything.
struct Failing;

impl Handler for Failing {
    fn handle<'a>(
        &'a self,
        _writer: &'a mut ResponseWriter,
        _request: &'a Request,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Err::<(), _>(anyhow::anyhow!("boom")) })
    }
}

/// Sleeps before answering, to keep a connection in flight.
struct Slow(Duration);

impl Handler for Slow {
    fn handle<'a>(
        &'a self,
        writer: &'a mut ResponseWriter,
        _request: &'a Request,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(self.0).await;
            writer.write_status_line(StatusCode::Ok).await?;
            writer.write_headers(&default_headers(4)).await?;
            writer.write_body(b"done").await?;
            Ok::<_, anyhow::Error>(())
        })
    }
}

async fn start(handler: impl Handler) -> (Server, SocketAddr, JoinHandle<anyhow::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(addr.to_string(), handler);

    let running = server.clone();
    let task = tokio::spawn(async move { running.serve_listener(listener).await });

    (server, addr, task)
}

async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_serves_parsed_request() {
    let (server, addr, task) = start(Echo).await;

    let response = roundtrip(
        addr,
        b"POST /submit HTTP/1.1\r\nHost: example.com\r\nContent-Length: 11\r\n\r\nHello World",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-length: 11\r\n"));
    assert!(response.contains("x-method: POST\r\n"));
    assert!(response.contains("x-path: /submit\r\n"));
    assert!(response.ends_with("\r\n\r\nHello World"));

    server.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_request_split_across_writes() {
    let (server, addr, task) = start(Echo).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    for piece in [&b"GET /sl"[..], b"ow HTTP/1.1\r\nHo", b"st: x\r\n", b"\r\n"] {
        stream.write_all(piece).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.contains("x-path: /slow\r\n"));

    server.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let (server, addr, task) = start(Echo).await;

    let response = roundtrip(addr, b"GET /hello\r\nHost: x\r\n\r\n").await;

    assert_eq!(
        response,
        "HTTP/1.1 400 Bad Request\r\n\
         content-length: 0\r\n\
         connection: close\r\n\
         content-type: text/plain\r\n\
         \r\n"
    );

    server.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failing_handler_gets_500() {
    let (server, addr, task) = start(Failing).await;

    let response = roundtrip(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    server.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (server, _addr, task) = start(Echo).await;

    assert!(!server.is_closed());
    server.close();
    server.close();
    assert!(server.is_closed());

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("accept loop did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_close_waits_for_in_flight_connections() {
    let (server, addr, task) = start(Slow(Duration::from_millis(300))).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    server.close();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\ndone"));

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("accept loop did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_close_before_serving_returns_immediately() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Server::new("127.0.0.1:0", Echo);
    server.close();

    tokio::time::timeout(Duration::from_secs(5), server.serve_listener(listener))
        .await
        .expect("accept loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_connections() {
    let (server, addr, task) = start(Echo).await;

    // A stalled client must not block the others
    let mut stalled = TcpStream::connect(addr).await.unwrap();
    stalled.write_all(b"GET /stalled HTTP/1.1\r\n").await.unwrap();

    let mut clients = Vec::new();
    for i in 0..8 {
        clients.push(tokio::spawn(async move {
            let raw = format!("GET /client/{} HTTP/1.1\r\nHost: x\r\n\r\n", i);
            roundtrip(addr, raw.as_bytes()).await
        }));
    }

    for (i, client) in clients.into_iter().enumerate() {
        let response = client.await.unwrap();
        assert!(response.contains(&format!("x-path: /client/{}\r\n", i)));
    }

    drop(stalled);
    server.close();
    task.await.unwrap().unwrap();
}

fn sample_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rawhttp-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn test_routes_static_pages() {
    let dir = sample_dir("static");
    let (server, addr, task) = start(Routes::new(&dir)).await;

    let home = roundtrip(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(home.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(home.contains("content-type: text/html\r\n"));
    assert!(home.ends_with("<h1>Welcome to rawhttp</h1>"));

    let missing = roundtrip(addr, b"GET /nope HTTP/1.1\r\n\r\n").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));

    let bad = roundtrip(addr, b"GET /bad-request HTTP/1.1\r\n\r\n").await;
    assert!(bad.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    let video = roundtrip(addr, b"GET /video HTTP/1.1\r\n\r\n").await;
    assert!(video.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    server.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_routes_stream_logs_chunked() {
    let dir = sample_dir("logs");
    std::fs::write(dir.join("server.log"), "line one\nline two\n").unwrap();
    let routes = Routes::new(&dir).with_log_delay(Duration::ZERO);
    let (server, addr, task) = start(routes).await;

    let response = roundtrip(addr, b"GET /logs HTTP/1.1\r\n\r\n").await;

    assert_eq!(
        response,
        "HTTP/1.1 200 OK\r\n\
         transfer-encoding: chunked\r\n\
         connection: close\r\n\
         content-type: text/plain\r\n\
         \r\n\
         12\r\nline one\nline two\n\r\n\
         0\r\n\r\n"
    );

    server.close();
    task.await.unwrap().unwrap();
}
