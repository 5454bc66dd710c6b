//! End-to-end tests of HttpTransport over real localhost sockets.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use cluster_transport::config::TransportConfig;
use cluster_transport::{HttpTransport, Request, ResponseCode, Transport};

mod common;

fn transport() -> HttpTransport {
    HttpTransport::new(TransportConfig::default())
}

async fn send(transport: &HttpTransport, request: &Request, timeout: Duration) -> cluster_transport::Response {
    transport
        .send(request, timeout, &CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_get_returns_backend_body() {
    let addr = common::start_mock_backend("hello from backend").await;
    let request = Request::get(&format!("http://{}/greeting", addr)).unwrap();

    let response = send(&transport(), &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::OK);
    let content = response.content().unwrap();
    assert_eq!(content.text(), "hello from backend");
    assert_eq!(content.content_type(), "application/octet-stream");
    assert_eq!(response.version(), Some(http::Version::HTTP_11));
}

#[tokio::test]
async fn test_not_found_keeps_body_and_headers() {
    let addr = common::start_programmable_backend(|_| async {
        (
            404,
            vec![("Content-Type", "text/plain; charset=utf-8".to_string())],
            b"no such thing".to_vec(),
        )
    })
    .await;
    let request = Request::get(&format!("http://{}/missing", addr)).unwrap();

    let response = send(&transport(), &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::NOT_FOUND);
    let content = response.content().unwrap();
    assert_eq!(content.text(), "no such thing");
    assert_eq!(content.content_type(), "text/plain");
    assert_eq!(content.charset(), "utf-8");
}

#[tokio::test]
async fn test_refused_connection_gives_connect_failure() {
    let request = Request::get(&format!("http://{}/", common::closed_port())).unwrap();

    let response = send(&transport(), &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::CONNECT_FAILURE);
    assert!(response.content().is_none());
}

#[tokio::test]
async fn test_https_target_is_a_connection_failure() {
    let request = Request::get("https://127.0.0.1:1/").unwrap();

    let response = send(&transport(), &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::CONNECT_FAILURE);
}

#[tokio::test]
async fn test_hanging_backend_times_out_within_grace() {
    let addr = common::start_hanging_backend().await;
    let request = Request::get(&format!("http://{}/slow", addr)).unwrap();

    let started = Instant::now();
    let response = send(&transport(), &request, Duration::from_millis(50)).await;
    let elapsed = started.elapsed();

    assert_eq!(response.code(), ResponseCode::REQUEST_TIMEOUT);
    assert!(elapsed >= Duration::from_millis(50), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(50 + 250 + 200), "{:?}", elapsed);
}

#[tokio::test]
async fn test_truncated_body_is_a_receive_failure() {
    let addr = common::start_truncated_backend(1000, 300).await;
    let request = Request::get(&format!("http://{}/partial", addr)).unwrap();

    let response = send(&transport(), &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::RECEIVE_FAILURE);
    assert_eq!(response.headers()["content-type"], "text/plain");
}

#[tokio::test]
async fn test_chunked_body_is_accumulated() {
    let chunks: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; 5000 + i as usize]).collect();
    let expected: Vec<u8> = chunks.concat();
    let addr = common::start_chunked_backend(chunks).await;
    let transport = transport();
    let request = Request::get(&format!("http://{}/stream", addr)).unwrap();

    let response = send(&transport, &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::OK);
    assert_eq!(response.content().unwrap().bytes().as_ref(), &expected[..]);
    assert_eq!(transport.buffer_pool().outstanding(), 0);
}

#[tokio::test]
async fn test_large_body_is_reproduced_exactly() {
    let body: Vec<u8> = (0..300_000u32).map(|i| (i % 253) as u8).collect();
    let expected = body.clone();
    let addr = common::start_programmable_backend(move |_| {
        let body = body.clone();
        async move { (200, Vec::new(), body) }
    })
    .await;
    let transport = transport();
    let request = Request::get(&format!("http://{}/blob", addr)).unwrap();

    let response = send(&transport, &request, Duration::from_secs(5)).await;

    assert_eq!(response.code(), ResponseCode::OK);
    assert_eq!(response.content().unwrap().bytes().as_ref(), &expected[..]);
    assert_eq!(transport.buffer_pool().outstanding(), 0);
}

#[tokio::test]
async fn test_request_content_reaches_backend() {
    let addr = common::start_programmable_backend(|request| async move {
        let framing = if request.header("content-length").is_some() {
            "length"
        } else {
            "chunked"
        };
        (200, vec![("X-Framing", framing.to_string())], request.body)
    })
    .await;
    let transport = transport();

    let sized = Request::post(&format!("http://{}/echo", addr))
        .unwrap()
        .with_content(&b"sized payload"[..]);
    let response = send(&transport, &sized, Duration::from_secs(5)).await;
    assert_eq!(response.content().unwrap().text(), "sized payload");
    assert_eq!(response.headers()["x-framing"], "length");

    let streamed = Request::put(&format!("http://{}/echo", addr))
        .unwrap()
        .with_chunked_content(vec![b'z'; 100_000]);
    let response = send(&transport, &streamed, Duration::from_secs(5)).await;
    assert_eq!(response.content().unwrap().len(), 100_000);
    assert_eq!(response.headers()["x-framing"], "chunked");
}

#[tokio::test]
async fn test_head_response_body_is_not_read() {
    let addr = common::start_raw_backend(|socket| async move {
        use tokio::io::AsyncWriteExt;
        let mut reader = tokio::io::BufReader::new(socket);
        if common::read_request(&mut reader).await.is_none() {
            return;
        }
        let _ = reader
            .get_mut()
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 12345\r\n\r\n")
            .await;
        tokio::time::sleep(Duration::from_secs(3600)).await;
    })
    .await;
    let request = Request::head(&format!("http://{}/file", addr)).unwrap();

    let response = send(&transport(), &request, Duration::from_secs(2)).await;

    assert_eq!(response.code(), ResponseCode::OK);
    assert!(response.content().is_none());
    assert_eq!(response.headers()["content-length"], "12345");
}

#[tokio::test]
async fn test_keep_alive_connection_is_reused() {
    let (addr, connections) = common::start_keep_alive_backend("pong").await;
    let transport = transport();
    let request = Request::get(&format!("http://{}/ping", addr)).unwrap();
    let authority = addr.to_string();

    let first = send(&transport, &request, Duration::from_secs(5)).await;
    assert_eq!(first.content().unwrap().text(), "pong");

    // The connection is parked by a background task once it is idle.
    let deadline = Instant::now() + Duration::from_secs(1);
    while transport.connector().idle_connections(&authority) == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(transport.connector().idle_connections(&authority), 1);

    let second = send(&transport, &request, Duration::from_secs(5)).await;
    assert_eq!(second.content().unwrap().text(), "pong");
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_caller_cancellation_returns_canceled() {
    let addr = common::start_hanging_backend().await;
    let transport = transport();
    let request = Request::get(&format!("http://{}/slow", addr)).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let response = transport
        .send(&request, Duration::from_secs(10), &cancel)
        .await;

    assert_eq!(response.code(), ResponseCode::CANCELED);
    assert_eq!(transport.buffer_pool().outstanding(), 0);
}

#[tokio::test]
async fn test_sub_millisecond_timeout_never_connects() {
    let (addr, connections) = common::start_keep_alive_backend("unused").await;
    let request = Request::get(&format!("http://{}/", addr)).unwrap();

    let response = send(&transport(), &request, Duration::from_micros(500)).await;

    assert_eq!(response.code(), ResponseCode::REQUEST_TIMEOUT);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 0);
}
