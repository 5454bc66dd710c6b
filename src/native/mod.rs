//! Native HTTP layer.
//!
//! The engine never talks to sockets directly. It drives an [`Exchange`]: one
//! native request/response cycle created by a [`Connector`] for every
//! connection attempt.
//!
//! # Data Flow
//! ```text
//! Connector::create(request, time remaining)
//!     → Exchange::open_request_stream() (connect, start request, body sink)
//!     → Exchange::response() (status, headers, body stream)
//!     → drop(Exchange) releases the connection
//! ```
//!
//! # Design Decisions
//! - Errors carry a [`TransportErrorKind`] so the classifier never inspects text
//! - Socket state is exposed through a cloneable [`SocketProbe`] so it can be
//!   checked while a phase future still borrows the exchange
//! - Dropping an exchange (or any of its futures) aborts it

pub mod http1;
pub mod pool;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, StatusCode, Version};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::model::Request;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Low-level failure condition reported by a native exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The remote end refused or could not be reached.
    ConnectFailure,
    /// A reused keep-alive connection turned out to be dead.
    KeepAliveFailure,
    /// The connection was closed before a response arrived.
    ConnectionClosed,
    /// A pipelined request was dropped with its connection.
    PipelineFailure,
    NameResolutionFailure,
    ProxyNameResolutionFailure,
    SecureChannelFailure,
    SendFailure,
    ReceiveFailure,
    RequestCanceled,
    Timeout,
    /// The native stack reported an error status as a failure.
    ProtocolError,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::ConnectFailure => "connect_failure",
            Self::KeepAliveFailure => "keep_alive_failure",
            Self::ConnectionClosed => "connection_closed",
            Self::PipelineFailure => "pipeline_failure",
            Self::NameResolutionFailure => "name_resolution_failure",
            Self::ProxyNameResolutionFailure => "proxy_name_resolution_failure",
            Self::SecureChannelFailure => "secure_channel_failure",
            Self::SendFailure => "send_failure",
            Self::ReceiveFailure => "receive_failure",
            Self::RequestCanceled => "request_canceled",
            Self::Timeout => "timeout",
            Self::ProtocolError => "protocol_error",
            Self::Other => "other",
        };
        f.write_str(text)
    }
}

/// Error raised by a native exchange.
#[derive(Debug, Error)]
#[error("transport error ({kind}): {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: TransportErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }
}

/// Marker error for operations aborted by a cancellation signal.
#[derive(Debug, Error, Default)]
#[error("operation was canceled")]
pub struct Canceled;

impl Canceled {
    /// Wrap as an I/O error that the classifier recognizes as cancellation.
    pub fn into_io(self) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Interrupted, self)
    }
}

/// Shared view of whether an exchange's socket is connected.
#[derive(Debug, Clone, Default)]
pub struct SocketProbe {
    connected: Arc<AtomicBool>,
}

impl SocketProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe for a socket that is already established (reused connections).
    pub fn connected() -> Self {
        let probe = Self::new();
        probe.mark_connected();
        probe
    }

    /// Non-blocking check.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }
}

/// Response head plus a body stream, as produced by the native layer.
pub struct NativeResponse<B> {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// Declared `Content-Length`; `None` when unknown.
    pub content_length: Option<u64>,
    pub body: B,
}

impl<B> std::fmt::Debug for NativeResponse<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeResponse")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Factory for per-attempt exchanges.
pub trait Connector: Send + Sync {
    type Exchange: Exchange;

    /// Build the native request for one attempt. Performs no I/O.
    fn create(&self, request: &Request, time_remaining: Duration) -> Self::Exchange;

    /// Whether exchanges expose a meaningful [`SocketProbe`].
    fn supports_socket_probe(&self) -> bool;
}

/// One native request/response cycle.
pub trait Exchange: Send {
    type Sink: AsyncWrite + Unpin + Send;
    type Body: AsyncRead + Unpin + Send;

    /// Connect if needed, start the request and return a sink for its content.
    fn open_request_stream(
        &mut self,
    ) -> impl Future<Output = Result<Self::Sink, TransportError>> + Send;

    /// Wait for the response head. Connects first when no content was sent.
    fn response(
        &mut self,
    ) -> impl Future<Output = Result<NativeResponse<Self::Body>, TransportError>> + Send;

    /// The response attached to the last `ProtocolError`, if the native stack
    /// reports error statuses as failures.
    fn take_error_response(&mut self) -> Option<NativeResponse<Self::Body>>;

    /// Socket state of this exchange.
    fn socket(&self) -> SocketProbe;
}
