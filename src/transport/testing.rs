//! Scripted native layer for engine tests.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http::{HeaderMap, HeaderValue, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::StreamReader;

use crate::model::Request;
use crate::native::{
    Connector, Exchange, NativeResponse, SocketProbe, TransportError, TransportErrorKind,
};

pub(crate) type MockBody = Pin<Box<dyn AsyncRead + Send>>;
pub(crate) type MockSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Body delivered in `chunk`-sized pieces.
pub(crate) fn chunked_body(data: &[u8], chunk: usize) -> MockBody {
    let chunks: Vec<io::Result<Bytes>> = data
        .chunks(chunk.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(StreamReader::new(stream::iter(chunks)))
}

/// Body that delivers `data` and then never ends.
pub(crate) fn stalled_body(data: &[u8]) -> MockBody {
    let first = stream::iter(vec![Ok::<_, io::Error>(Bytes::copy_from_slice(data))]);
    Box::pin(StreamReader::new(first.chain(stream::pending())))
}

/// Body that delivers `data` and then fails.
pub(crate) fn failing_body(data: &[u8], error: io::Error) -> MockBody {
    let items = vec![Ok(Bytes::copy_from_slice(data)), Err(error)];
    Box::pin(StreamReader::new(stream::iter(items)))
}

/// What one exchange does.
pub(crate) struct Script {
    /// Time spent connecting before anything resolves.
    pub connect_delay: Duration,
    /// Time between connecting and the response head.
    pub response_delay: Duration,
    /// The socket never connects and nothing resolves.
    pub hang: bool,
    /// Writes to the request stream fail.
    pub sink_fails: bool,
    /// Report the response as a `ProtocolError` carrying it.
    pub protocol_error: bool,
    pub outcome: Result<MockResponse, TransportErrorKind>,
}

pub(crate) struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub content_length: Option<u64>,
    pub body: MockBody,
}

impl Script {
    pub fn fail(kind: TransportErrorKind) -> Self {
        Self {
            connect_delay: Duration::ZERO,
            response_delay: Duration::ZERO,
            hang: false,
            sink_fails: false,
            protocol_error: false,
            outcome: Err(kind),
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::fail(TransportErrorKind::Other)
        }
    }

    /// Response whose body is `body` with a matching `Content-Length`.
    pub fn respond(status: u16, body: &[u8]) -> Self {
        Self::respond_with(
            status,
            Some(body.len() as u64),
            chunked_body(body, 16 * 1024),
        )
    }

    pub fn respond_with(status: u16, content_length: Option<u64>, body: MockBody) -> Self {
        Self {
            outcome: Ok(MockResponse {
                status,
                headers: Vec::new(),
                content_length,
                body,
            }),
            ..Self::fail(TransportErrorKind::Other)
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        if let Ok(response) = &mut self.outcome {
            response.headers.push((name, value));
        }
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn slow_response(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn as_protocol_error(mut self) -> Self {
        self.protocol_error = true;
        self
    }

    pub fn with_failing_sink(mut self) -> Self {
        self.sink_fails = true;
        self
    }
}

/// What the engine did with the connector.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    /// `time_remaining` passed to every `create`.
    pub created: Vec<Duration>,
    /// Bytes written to request streams, per exchange.
    pub written: Vec<Vec<u8>>,
    /// Exchanges dropped so far.
    pub released: usize,
    /// Value of `released` at the moment of every `create`.
    pub released_at_create: Vec<usize>,
}

pub(crate) struct MockConnector {
    scripts: Mutex<VecDeque<Script>>,
    pub journal: Arc<Mutex<Journal>>,
    pub probe_support: bool,
}

impl MockConnector {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            journal: Arc::new(Mutex::new(Journal::default())),
            probe_support: true,
        }
    }

    pub fn without_socket_probe(mut self) -> Self {
        self.probe_support = false;
        self
    }

    pub fn attempts(&self) -> usize {
        self.journal.lock().unwrap().created.len()
    }

    pub fn released(&self) -> usize {
        self.journal.lock().unwrap().released
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.journal.lock().unwrap().written.clone()
    }

    pub fn released_at_create(&self) -> Vec<usize> {
        self.journal.lock().unwrap().released_at_create.clone()
    }

    pub fn time_remaining(&self) -> Vec<Duration> {
        self.journal.lock().unwrap().created.clone()
    }
}

impl Connector for MockConnector {
    type Exchange = MockExchange;

    fn create(&self, _request: &Request, time_remaining: Duration) -> MockExchange {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::fail(TransportErrorKind::ConnectFailure));

        let index = {
            let mut journal = self.journal.lock().unwrap();
            let released = journal.released;
            journal.released_at_create.push(released);
            journal.created.push(time_remaining);
            journal.written.push(Vec::new());
            journal.written.len() - 1
        };

        MockExchange {
            script: Some(script),
            socket: SocketProbe::new(),
            connected: false,
            error_response: None,
            journal: Arc::clone(&self.journal),
            index,
        }
    }

    fn supports_socket_probe(&self) -> bool {
        self.probe_support
    }
}

pub(crate) struct MockExchange {
    script: Option<Script>,
    socket: SocketProbe,
    connected: bool,
    error_response: Option<NativeResponse<MockBody>>,
    journal: Arc<Mutex<Journal>>,
    index: usize,
}

fn is_connect_level(kind: TransportErrorKind) -> bool {
    matches!(
        kind,
        TransportErrorKind::ConnectFailure
            | TransportErrorKind::NameResolutionFailure
            | TransportErrorKind::ProxyNameResolutionFailure
            | TransportErrorKind::SecureChannelFailure
    )
}

impl MockExchange {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }
        let Some(script) = self.script.as_ref() else {
            return Err(TransportError::new(TransportErrorKind::Other, "script used"));
        };
        let hang = script.hang;
        let delay = script.connect_delay;
        let failure = script.outcome.as_ref().err().copied().filter(|k| is_connect_level(*k));

        if hang {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(delay).await;
        if let Some(kind) = failure {
            return Err(TransportError::new(kind, "scripted connect failure"));
        }
        self.socket.mark_connected();
        self.connected = true;
        Ok(())
    }
}

impl Exchange for MockExchange {
    type Sink = MockSink;
    type Body = MockBody;

    async fn open_request_stream(&mut self) -> Result<MockSink, TransportError> {
        self.connect().await?;
        let fails = self.script.as_ref().is_some_and(|s| s.sink_fails);
        Ok(Box::pin(RecordingSink {
            journal: Arc::clone(&self.journal),
            index: self.index,
            fails,
        }))
    }

    async fn response(&mut self) -> Result<NativeResponse<MockBody>, TransportError> {
        self.connect().await?;
        let delay = self.script.as_ref().map_or(Duration::ZERO, |s| s.response_delay);
        tokio::time::sleep(delay).await;
        let Some(script) = self.script.take() else {
            return Err(TransportError::new(TransportErrorKind::Other, "script used"));
        };
        let response = match script.outcome {
            Ok(response) => response,
            Err(kind) => return Err(TransportError::new(kind, "scripted failure")),
        };

        let mut headers = HeaderMap::new();
        for (name, value) in response.headers {
            headers.append(name, HeaderValue::from_static(value));
        }
        let native = NativeResponse {
            status: StatusCode::from_u16(response.status).unwrap(),
            version: Version::HTTP_11,
            headers,
            content_length: response.content_length,
            body: response.body,
        };

        if script.protocol_error {
            self.error_response = Some(native);
            return Err(TransportError::new(
                TransportErrorKind::ProtocolError,
                "error status",
            ));
        }
        Ok(native)
    }

    fn take_error_response(&mut self) -> Option<NativeResponse<MockBody>> {
        self.error_response.take()
    }

    fn socket(&self) -> SocketProbe {
        self.socket.clone()
    }
}

impl Drop for MockExchange {
    fn drop(&mut self) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.released += 1;
        }
    }
}

struct RecordingSink {
    journal: Arc<Mutex<Journal>>,
    index: usize,
    fails: bool,
}

impl AsyncWrite for RecordingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fails {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted write failure",
            )));
        }
        self.journal.lock().unwrap().written[self.index].extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
