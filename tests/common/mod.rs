//! Shared utilities for integration and load testing.
//!
//! Every backend binds an ephemeral localhost port and speaks just enough
//! HTTP/1.1 over raw TCP to exercise the transport.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by a mock backend.
#[derive(Debug, Clone, Default)]
pub struct ReceivedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read one request (head plus `Content-Length` or chunked body).
/// `None` when the client closed the connection.
pub async fn read_request<R>(reader: &mut BufReader<R>) -> Option<ReceivedRequest>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut request = ReceivedRequest::default();
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    request.request_line = line.trim_end().to_string();

    loop {
        line.clear();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            request
                .headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    if let Some(length) = request.header("content-length") {
        let length: usize = length.parse().ok()?;
        let mut body = vec![0; length];
        reader.read_exact(&mut body).await.ok()?;
        request.body = body;
    } else if request
        .header("transfer-encoding")
        .is_some_and(|te| te.eq_ignore_ascii_case("chunked"))
    {
        loop {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            let size = usize::from_str_radix(line.trim(), 16).ok()?;
            if size == 0 {
                line.clear();
                reader.read_line(&mut line).await.ok()?;
                break;
            }
            let mut chunk = vec![0; size + 2];
            reader.read_exact(&mut chunk).await.ok()?;
            request.body.extend_from_slice(&chunk[..size]);
        }
    }

    Some(request)
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        204 => "204 No Content",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Serialize a complete response with a `Content-Length`.
pub fn response_bytes(status: u16, headers: &[(&str, &str)], body: &[u8], close: bool) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status_text(status), body.len());
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if close {
        head.push_str("Connection: close\r\n");
    }
    head.push_str("\r\n");
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Start a backend that hands every accepted connection to `handler`.
pub async fn start_raw_backend<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(handler(socket));
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Start a simple mock backend that returns a fixed response and closes.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_raw_backend(move |socket| async move {
        let mut reader = BufReader::new(socket);
        if read_request(&mut reader).await.is_none() {
            return;
        }
        let mut socket = reader.into_inner();
        let _ = socket
            .write_all(&response_bytes(200, &[], response.as_bytes(), true))
            .await;
        let _ = socket.shutdown().await;
    })
    .await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(ReceivedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<(&'static str, String)>, Vec<u8>)> + Send + 'static,
{
    let f = Arc::new(f);
    start_raw_backend(move |socket| {
        let f = f.clone();
        async move {
            let mut reader = BufReader::new(socket);
            let Some(request) = read_request(&mut reader).await else {
                return;
            };
            let (status, headers, body) = f(request).await;
            let headers: Vec<(&str, &str)> =
                headers.iter().map(|(n, v)| (*n, v.as_str())).collect();
            let mut socket = reader.into_inner();
            let _ = socket
                .write_all(&response_bytes(status, &headers, &body, true))
                .await;
            let _ = socket.shutdown().await;
        }
    })
    .await
}

/// Backend that keeps connections alive and counts how many it accepted.
pub async fn start_keep_alive_backend(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    let addr = start_raw_backend(move |socket| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            let mut reader = BufReader::new(socket);
            while read_request(&mut reader).await.is_some() {
                let response = response_bytes(200, &[], body.as_bytes(), false);
                if reader.get_mut().write_all(&response).await.is_err() {
                    return;
                }
            }
        }
    })
    .await;
    (addr, connections)
}

/// Backend that accepts connections and never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    start_raw_backend(|socket| async move {
        let _socket = socket;
        tokio::time::sleep(Duration::from_secs(3600)).await;
    })
    .await
}

/// Backend that declares `declared` bytes but sends only `sent` and closes.
pub async fn start_truncated_backend(declared: usize, sent: usize) -> SocketAddr {
    start_raw_backend(move |socket| async move {
        let mut reader = BufReader::new(socket);
        if read_request(&mut reader).await.is_none() {
            return;
        }
        let mut socket = reader.into_inner();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: text/plain\r\n\r\n",
            declared
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&vec![b'x'; sent]).await;
        let _ = socket.shutdown().await;
    })
    .await
}

/// Backend answering with a chunked body built from `chunks`.
pub async fn start_chunked_backend(chunks: Vec<Vec<u8>>) -> SocketAddr {
    let chunks = Arc::new(chunks);
    start_raw_backend(move |socket| {
        let chunks = chunks.clone();
        async move {
            let mut reader = BufReader::new(socket);
            if read_request(&mut reader).await.is_none() {
                return;
            }
            let mut socket = reader.into_inner();
            let mut out =
                b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
                    .to_vec();
            for chunk in chunks.iter() {
                out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                out.extend_from_slice(chunk);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
            let _ = socket.write_all(&out).await;
            let _ = socket.shutdown().await;
        }
    })
    .await
}

/// Address of a port nobody listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
