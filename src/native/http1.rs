//! HTTP/1.1 exchanges on top of hyper.
//!
//! # Responsibilities
//! - Resolve and connect to the target, or reuse a pooled keep-alive connection
//! - Stream request content through an in-memory pipe into the hyper body
//! - Translate hyper and socket errors into [`TransportErrorKind`]s
//!
//! # Design Decisions
//! - One connection per exchange; hyper's connection task is spawned and owns
//!   the socket, so dropping the exchange closes an unfinished connection
//! - TCP connect is bounded by the time remaining for the attempt
//! - No TLS backend is bundled: `https` targets fail with a secure-channel error

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::header::{HeaderValue, CONTENT_LENGTH, HOST};
use http::{HeaderMap, Method, Uri};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, DuplexStream};
use tokio::net::TcpStream;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::config::ConnectionConfig;
use crate::model::Request;
use crate::native::pool::{ConnectionPool, Poolable};
use crate::native::{
    Canceled, Connector, Exchange, NativeResponse, SocketProbe, TransportError,
    TransportErrorKind,
};

/// Capacity of the pipe between the request content writer and hyper.
const REQUEST_PIPE_CAPACITY: usize = 64 * 1024;

type ReqBody = BoxBody<Bytes, io::Error>;
type ResponseFuture = Pin<Box<dyn Future<Output = hyper::Result<http::Response<Incoming>>> + Send>>;

/// Response body as an async byte stream.
pub type HyperBody = Pin<Box<dyn AsyncRead + Send>>;

impl Poolable for SendRequest<ReqBody> {
    fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

/// [`Connector`] producing HTTP/1.1 exchanges over plain TCP.
#[derive(Debug, Clone)]
pub struct HyperConnector {
    pool: ConnectionPool<SendRequest<ReqBody>>,
    nodelay: bool,
}

impl HyperConnector {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            pool: ConnectionPool::new(config.max_idle_per_host, config.idle_timeout()),
            nodelay: config.tcp_nodelay,
        }
    }

    /// Idle keep-alive connections parked for `authority` (`host:port`).
    pub fn idle_connections(&self, authority: &str) -> usize {
        self.pool.idle_count(authority)
    }
}

impl Connector for HyperConnector {
    type Exchange = HyperExchange;

    fn create(&self, request: &Request, time_remaining: Duration) -> HyperExchange {
        let url = request.url();
        let mut headers = request.headers().clone();
        if !headers.contains_key(HOST) {
            if let Ok(host) = HeaderValue::from_str(&host_header(url)) {
                headers.insert(HOST, host);
            }
        }
        let content_length = request.content().and_then(|content| content.declared_length());
        if let Some(length) = content_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        }

        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        HyperExchange {
            method: request.method().clone(),
            path_and_query,
            headers,
            target: Target::from_url(url),
            authority: request.authority(),
            time_remaining,
            nodelay: self.nodelay,
            pool: self.pool.clone(),
            socket: SocketProbe::new(),
            sender: None,
            reused: false,
            pending: None,
        }
    }

    fn supports_socket_probe(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
enum Target {
    Addr(SocketAddr),
    Domain(String, u16),
    Https,
    Invalid,
}

impl Target {
    fn from_url(url: &url::Url) -> Self {
        if url.scheme() == "https" {
            return Target::Https;
        }
        let Some(port) = url.port_or_known_default() else {
            return Target::Invalid;
        };
        match url.host() {
            Some(url::Host::Ipv4(addr)) => Target::Addr(SocketAddr::from((addr, port))),
            Some(url::Host::Ipv6(addr)) => Target::Addr(SocketAddr::from((addr, port))),
            Some(url::Host::Domain(domain)) => Target::Domain(domain.to_string(), port),
            None => Target::Invalid,
        }
    }
}

fn host_header(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// One HTTP/1.1 request/response cycle.
pub struct HyperExchange {
    method: Method,
    path_and_query: String,
    headers: HeaderMap,
    target: Target,
    authority: String,
    time_remaining: Duration,
    nodelay: bool,
    pool: ConnectionPool<SendRequest<ReqBody>>,
    socket: SocketProbe,
    sender: Option<SendRequest<ReqBody>>,
    reused: bool,
    pending: Option<ResponseFuture>,
}

impl HyperExchange {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.sender.is_some() {
            return Ok(());
        }

        if let Some(sender) = self.pool.checkout(&self.authority) {
            tracing::trace!(authority = %self.authority, "Reusing keep-alive connection");
            self.socket.mark_connected();
            self.sender = Some(sender);
            self.reused = true;
            return Ok(());
        }

        let addrs = resolve(&self.target).await?;
        let stream = match tokio::time::timeout(self.time_remaining, connect_any(&addrs)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(TransportError::new(
                    TransportErrorKind::Timeout,
                    format!("connect to {} did not complete in time", self.authority),
                ))
            }
        };
        if self.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(authority = %self.authority, error = %e, "Failed to set TCP_NODELAY");
            }
        }
        self.socket.mark_connected();

        let (sender, conn) = http1::handshake::<_, ReqBody>(TokioIo::new(stream))
            .await
            .map_err(|e| {
                TransportError::with_source(
                    TransportErrorKind::ConnectionClosed,
                    "http handshake failed",
                    e,
                )
            })?;

        let authority = self.authority.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(authority = %authority, error = %e, "Connection closed with error");
            }
        });

        self.sender = Some(sender);
        self.reused = false;
        Ok(())
    }

    fn dispatch(&mut self, body: ReqBody) -> Result<(), TransportError> {
        let uri: Uri = self.path_and_query.parse().map_err(|e| {
            TransportError::with_source(TransportErrorKind::Other, "invalid request path", e)
        })?;
        let mut builder = http::Request::builder().method(self.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }
        let request = builder.body(body).map_err(|e| {
            TransportError::with_source(TransportErrorKind::Other, "failed to build request", e)
        })?;

        let Some(sender) = self.sender.as_mut() else {
            return Err(TransportError::new(
                TransportErrorKind::ConnectionClosed,
                "no connection",
            ));
        };
        self.pending = Some(Box::pin(sender.send_request(request)));
        Ok(())
    }

    async fn ready(&mut self) -> Result<(), TransportError> {
        let reused = self.reused;
        let Some(sender) = self.sender.as_mut() else {
            return Err(TransportError::new(
                TransportErrorKind::ConnectionClosed,
                "no connection",
            ));
        };
        sender
            .ready()
            .await
            .map_err(|e| TransportError::with_source(classify_hyper_error(&e, reused), "connection not ready", e))
    }

    /// Return the connection to the pool once the response body is drained.
    fn release_connection(&mut self) {
        let Some(mut sender) = self.sender.take() else {
            return;
        };
        let pool = self.pool.clone();
        let authority = self.authority.clone();
        tokio::spawn(async move {
            if sender.ready().await.is_ok() && pool.checkin(&authority, sender) {
                tracing::trace!(authority = %authority, "Connection parked for reuse");
            }
        });
    }
}

impl Exchange for HyperExchange {
    type Sink = DuplexStream;
    type Body = HyperBody;

    async fn open_request_stream(&mut self) -> Result<DuplexStream, TransportError> {
        self.connect().await?;
        self.ready().await?;

        let (writer, reader) = tokio::io::duplex(REQUEST_PIPE_CAPACITY);
        let frames = ReaderStream::new(reader).map_ok(Frame::data);
        self.dispatch(BodyExt::boxed(StreamBody::new(frames)))?;
        Ok(writer)
    }

    async fn response(&mut self) -> Result<NativeResponse<HyperBody>, TransportError> {
        if self.pending.is_none() {
            self.connect().await?;
            self.ready().await?;
            let empty: ReqBody = Empty::<Bytes>::new().map_err(|never| match never {}).boxed();
            self.dispatch(empty)?;
        }
        let Some(pending) = self.pending.take() else {
            return Err(TransportError::new(TransportErrorKind::Other, "request was not sent"));
        };

        let response = pending.await.map_err(|e| {
            let kind = classify_hyper_error(&e, self.reused);
            TransportError::with_source(kind, "failed to receive response head", e)
        })?;
        self.release_connection();

        let (parts, incoming) = response.into_parts();
        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let stream = incoming.into_data_stream().map_err(body_error);

        Ok(NativeResponse {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            content_length,
            body: Box::pin(StreamReader::new(stream)),
        })
    }

    fn take_error_response(&mut self) -> Option<NativeResponse<HyperBody>> {
        // hyper delivers every status as a regular response.
        None
    }

    fn socket(&self) -> SocketProbe {
        self.socket.clone()
    }
}

async fn resolve(target: &Target) -> Result<Vec<SocketAddr>, TransportError> {
    match target {
        Target::Addr(addr) => Ok(vec![*addr]),
        Target::Domain(host, port) => {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), *port))
                .await
                .map_err(|e| {
                    TransportError::with_source(
                        TransportErrorKind::NameResolutionFailure,
                        format!("failed to resolve {}", host),
                        e,
                    )
                })?
                .collect();
            if addrs.is_empty() {
                return Err(TransportError::new(
                    TransportErrorKind::NameResolutionFailure,
                    format!("no addresses for {}", host),
                ));
            }
            Ok(addrs)
        }
        Target::Https => Err(TransportError::new(
            TransportErrorKind::SecureChannelFailure,
            "https is not supported by this connector",
        )),
        Target::Invalid => Err(TransportError::new(
            TransportErrorKind::Other,
            "request url has no usable host",
        )),
    }
}

async fn connect_any(addrs: &[SocketAddr]) -> Result<TcpStream, TransportError> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::trace!(addr = %addr, error = %e, "TCP connect failed");
                last_error = Some(e);
            }
        }
    }
    let error = last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to connect to"));
    Err(TransportError::with_source(
        classify_connect_error(&error),
        "failed to connect",
        error,
    ))
}

fn classify_connect_error(error: &io::Error) -> TransportErrorKind {
    match error.kind() {
        io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
            TransportErrorKind::ConnectionClosed
        }
        _ => TransportErrorKind::ConnectFailure,
    }
}

/// Map a hyper error raised before the response head arrived.
fn classify_hyper_error(error: &hyper::Error, reused: bool) -> TransportErrorKind {
    let closed = if reused {
        TransportErrorKind::KeepAliveFailure
    } else {
        TransportErrorKind::ConnectionClosed
    };

    if error.is_timeout() {
        return TransportErrorKind::Timeout;
    }
    if error.is_body_write_aborted() {
        return TransportErrorKind::SendFailure;
    }
    if error.is_canceled() || error.is_closed() || error.is_incomplete_message() {
        return closed;
    }
    if error.is_parse() || error.is_user() {
        return TransportErrorKind::Other;
    }

    match find_io_error(error).map(io::Error::kind) {
        Some(
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof,
        ) => closed,
        Some(io::ErrorKind::TimedOut) => TransportErrorKind::Timeout,
        Some(_) => TransportErrorKind::ReceiveFailure,
        None => TransportErrorKind::Other,
    }
}

fn find_io_error(error: &hyper::Error) -> Option<&io::Error> {
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            return Some(io_error);
        }
        source = err.source();
    }
    None
}

fn body_error(error: hyper::Error) -> io::Error {
    if error.is_canceled() {
        return Canceled.into_io();
    }
    io::Error::new(io::ErrorKind::Other, error)
}
