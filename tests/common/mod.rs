//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use rr_proxy::{HttpServer, ProxyConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Request line and headers, without the trailing blank line.
    pub head: String,
    pub body: Vec<u8>,
}

impl SeenRequest {
    /// Value of the first header called `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }
}

/// Read one HTTP/1.1 request: head plus a Content-Length body.
async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut seen = SeenRequest {
        head,
        body: buf[head_end + 4..].to_vec(),
    };

    let length: usize = seen
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while seen.body.len() < length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        seen.body.extend_from_slice(&chunk[..n]);
    }
    Some(seen)
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Backend: mock\r\nConnection: close\r\n\r\n",
        status_line(status),
        body.len()
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(body).await;
    let _ = socket.shutdown().await;
}

/// Start a mock backend that hands each parsed request and its socket to `f`.
///
/// `f` owns the connection and writes whatever it likes.
pub async fn start_raw_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(TcpStream, SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    f(socket, request).await;
                }
            });
        }
    });

    addr
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives each request and returns the status and body to send back.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<u8>)> + Send + 'static,
{
    let f = Arc::new(f);
    start_raw_backend(move |mut socket, request| {
        let f = f.clone();
        async move {
            let (status, body) = f(request).await;
            write_response(&mut socket, status, &body).await;
        }
    })
    .await
}

/// Start a mock backend that always answers 200 with `response`.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, response.as_bytes().to_vec()) }).await
}

/// Start a backend that answers with the raw request it received.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|request| async move {
        let mut body = request.head.into_bytes();
        body.extend_from_slice(b"\r\n\r\n");
        body.extend_from_slice(&request.body);
        (200, body)
    })
    .await
}

/// An address nothing is listening on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// A running proxy instance.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the proxy in front of `upstreams` on an ephemeral port.
pub async fn start_proxy(upstreams: Vec<String>) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.upstreams = upstreams;
    start_proxy_with(config).await
}

pub async fn start_proxy_with(mut config: ProxyConfig) -> TestProxy {
    config.listener.host = "127.0.0.1".into();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestProxy {
        addr,
        shutdown,
        handle,
    }
}

/// Send `raw` to `addr` as-is and return everything read until EOF.
pub async fn send_raw(addr: SocketAddr, raw: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(raw.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).to_string()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
