//! Failure classification.
//!
//! Every native failure is folded into the closed [`HttpActionStatus`] set at
//! the point where it happens, and logged there.

use std::io;

use crate::model::ResponseCode;
use crate::native::{Canceled, TransportError, TransportErrorKind};

/// Outcome of one pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HttpActionStatus {
    Success,
    ConnectionFailure,
    SendFailure,
    ReceiveFailure,
    Timeout,
    RequestCanceled,
    ProtocolError,
    UnknownFailure,
}

impl HttpActionStatus {
    /// Synthetic response code for a final non-success status.
    pub fn failure_code(self) -> ResponseCode {
        match self {
            HttpActionStatus::SendFailure => ResponseCode::SEND_FAILURE,
            HttpActionStatus::ReceiveFailure => ResponseCode::RECEIVE_FAILURE,
            HttpActionStatus::Timeout => ResponseCode::REQUEST_TIMEOUT,
            HttpActionStatus::RequestCanceled => ResponseCode::CANCELED,
            HttpActionStatus::ConnectionFailure => ResponseCode::CONNECT_FAILURE,
            HttpActionStatus::Success
            | HttpActionStatus::ProtocolError
            | HttpActionStatus::UnknownFailure => ResponseCode::UNKNOWN_FAILURE,
        }
    }
}

impl From<TransportErrorKind> for HttpActionStatus {
    fn from(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::ConnectFailure
            | TransportErrorKind::KeepAliveFailure
            | TransportErrorKind::ConnectionClosed
            | TransportErrorKind::PipelineFailure
            | TransportErrorKind::NameResolutionFailure
            | TransportErrorKind::ProxyNameResolutionFailure
            | TransportErrorKind::SecureChannelFailure => HttpActionStatus::ConnectionFailure,
            TransportErrorKind::SendFailure => HttpActionStatus::SendFailure,
            TransportErrorKind::ReceiveFailure => HttpActionStatus::ReceiveFailure,
            TransportErrorKind::RequestCanceled => HttpActionStatus::RequestCanceled,
            TransportErrorKind::Timeout => HttpActionStatus::Timeout,
            TransportErrorKind::ProtocolError => HttpActionStatus::ProtocolError,
            TransportErrorKind::Other => HttpActionStatus::UnknownFailure,
        }
    }
}

/// Where a failure happened, for log fields.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailureContext<'a> {
    pub target: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
}

/// Classify a native error and log it at the level its class deserves.
pub(crate) fn classify(error: &TransportError, ctx: FailureContext<'_>) -> HttpActionStatus {
    let status = HttpActionStatus::from(error.kind());
    match status {
        HttpActionStatus::ConnectionFailure => {
            tracing::error!(
                target_host = %ctx.target,
                attempt = ctx.attempt,
                max_attempts = ctx.max_attempts,
                status = %error.kind(),
                error = %error,
                "Connection failure"
            );
        }
        HttpActionStatus::SendFailure
        | HttpActionStatus::ReceiveFailure
        | HttpActionStatus::UnknownFailure => {
            tracing::error!(
                target_host = %ctx.target,
                status = %error.kind(),
                error = %error,
                "Error in sending request"
            );
        }
        _ => {}
    }
    status
}

/// Whether an I/O error stands for an aborted operation rather than a fault.
pub(crate) fn is_cancellation(error: &io::Error) -> bool {
    if let Some(inner) = error.get_ref() {
        if inner.is::<Canceled>() {
            return true;
        }
        if let Some(transport) = inner.downcast_ref::<TransportError>() {
            return transport.kind() == TransportErrorKind::RequestCanceled;
        }
    }
    false
}
