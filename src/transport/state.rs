//! Per-send mutable state.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode, Version};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use std::time::Duration;

use crate::native::{Exchange, NativeResponse};

/// Status line and headers of the native response.
#[derive(Debug, Clone)]
pub(crate) struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
}

/// Destination of the response body. Only one kind is ever in use.
#[derive(Debug, Default)]
pub(crate) enum BodyBuffer {
    #[default]
    None,
    /// Allocated up front for a declared length; `filled` bytes are valid.
    Exact { bytes: Vec<u8>, filled: usize },
    /// Grows until end of stream.
    Growable(BytesMut),
}

impl BodyBuffer {
    /// Bytes received so far, if a body was being read.
    pub fn take_bytes(&mut self) -> Option<Bytes> {
        match std::mem::take(self) {
            BodyBuffer::None => None,
            BodyBuffer::Exact { mut bytes, filled } => {
                bytes.truncate(filled);
                Some(Bytes::from(bytes))
            }
            BodyBuffer::Growable(buf) => Some(buf.freeze()),
        }
    }
}

/// State of one logical send, reused by every connection attempt.
pub(crate) struct AttemptState<E: Exchange> {
    pub exchange: Option<E>,
    /// 1-based number of the current attempt; 0 before the first.
    pub attempt: u32,
    deadline: Instant,
    /// Cancelled by the caller or by the overall timeout.
    pub request_cancel: CancellationToken,
    /// Cancelled by the connect-timeout prober; child of `request_cancel`.
    pub attempt_cancel: CancellationToken,
    pub head: Option<ResponseHead>,
    pub body_stream: Option<E::Body>,
    pub body: BodyBuffer,
}

impl<E: Exchange> AttemptState<E> {
    pub fn new(timeout: Duration, request_cancel: CancellationToken) -> Self {
        let attempt_cancel = request_cancel.child_token();
        Self {
            exchange: None,
            attempt: 0,
            deadline: Instant::now() + timeout,
            request_cancel,
            attempt_cancel,
            head: None,
            body_stream: None,
            body: BodyBuffer::None,
        }
    }

    pub fn time_remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn request_cancelled(&self) -> bool {
        self.request_cancel.is_cancelled()
    }

    /// Cancel every attempt of this send.
    pub fn cancel_request(&self) {
        self.request_cancel.cancel();
    }

    /// Cancel only the current attempt.
    pub fn cancel_attempt(&self) {
        self.attempt_cancel.cancel();
    }

    /// Store the native response, splitting off its body stream.
    pub fn set_response(&mut self, response: NativeResponse<E::Body>) {
        self.head = Some(ResponseHead {
            status: response.status,
            version: response.version,
            headers: response.headers,
            content_length: response.content_length,
        });
        self.body_stream = Some(response.body);
    }

    /// Drop the native exchange and body stream.
    pub fn release(&mut self) {
        self.body_stream = None;
        self.exchange = None;
    }

    /// Release the previous attempt and clear every per-attempt field.
    pub fn reset(&mut self) {
        self.release();
        self.head = None;
        self.body = BodyBuffer::None;
        self.attempt_cancel = self.request_cancel.child_token();
    }
}
