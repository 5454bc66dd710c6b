//! Per-attempt pipeline.
//!
//! # Data Flow
//! ```text
//! send body (if any)     ── connect-timeout prober
//!     → get response     ── prober only when no body was sent
//!     → read body        ── skipped for HEAD and Content-Length: 0
//! ```
//!
//! Every phase checks the request token before it starts and races the
//! attempt token while it runs.

use tokio::io::AsyncWriteExt;

use crate::model::{Content, Request, Response, ResponseCode};
use crate::native::{Connector, Exchange};
use crate::resilience::cancellable;
use crate::transport::body::{read_body, ReadLimits};
use crate::transport::classify::{classify, is_cancellation, FailureContext, HttpActionStatus};
use crate::transport::connect_timeout::{connect_probe, limit_connect_time};
use crate::transport::response_builder::{build_failure, build_success};
use crate::transport::state::AttemptState;
use crate::transport::HttpTransport;

/// Result of one connection attempt.
pub(crate) enum AttemptOutcome {
    /// Connection-level failure; another attempt may follow.
    Retry,
    Done(Response),
}

impl<C: Connector> HttpTransport<C> {
    pub(crate) async fn run_attempt(
        &self,
        request: &Request,
        state: &mut AttemptState<C::Exchange>,
        ctx: FailureContext<'_>,
    ) -> AttemptOutcome {
        let supports_probe = self.connector.supports_socket_probe();

        if let Some(content) = request.content() {
            if state.request_cancelled() {
                return AttemptOutcome::Done(Response::new(ResponseCode::CANCELED));
            }
            let probe = connect_probe(&self.config.connect_timeout, supports_probe, request, state);
            let status = limit_connect_time(probe, send_body(state, content, ctx), ctx).await;
            match status {
                HttpActionStatus::Success => {}
                HttpActionStatus::ConnectionFailure => return AttemptOutcome::Retry,
                other => return AttemptOutcome::Done(build_failure(other, state)),
            }
        }

        if state.request_cancelled() {
            return AttemptOutcome::Done(Response::new(ResponseCode::CANCELED));
        }
        let status = if request.content().is_some() {
            get_response(state, ctx).await
        } else {
            let probe = connect_probe(&self.config.connect_timeout, supports_probe, request, state);
            limit_connect_time(probe, get_response(state, ctx), ctx).await
        };
        match status {
            HttpActionStatus::Success => {}
            HttpActionStatus::ConnectionFailure => return AttemptOutcome::Retry,
            other => return AttemptOutcome::Done(build_failure(other, state)),
        }

        if !needs_body(request, state) {
            return AttemptOutcome::Done(build_success(state));
        }
        if state.request_cancelled() {
            return AttemptOutcome::Done(Response::new(ResponseCode::CANCELED));
        }

        let limits = ReadLimits {
            preferred_read_size: self.config.buffers.preferred_read_size,
            large_object_threshold: self.config.buffers.large_object_threshold,
        };
        let status = read_response_body(state, &self.buffers, limits, ctx).await;
        AttemptOutcome::Done(match status {
            HttpActionStatus::Success => build_success(state),
            other => build_failure(other, state),
        })
    }
}

async fn send_body<E: Exchange>(
    state: &mut AttemptState<E>,
    content: &Content,
    ctx: FailureContext<'_>,
) -> HttpActionStatus {
    let cancel = state.attempt_cancel.clone();
    let Some(exchange) = state.exchange.as_mut() else {
        return HttpActionStatus::UnknownFailure;
    };

    let mut sink = match cancellable(exchange.open_request_stream(), &cancel).await {
        None => return HttpActionStatus::RequestCanceled,
        Some(Ok(sink)) => sink,
        Some(Err(error)) => return classify(&error, ctx),
    };

    let copy = async {
        sink.write_all(content.bytes()).await?;
        sink.shutdown().await
    };
    match cancellable(copy, &cancel).await {
        None => HttpActionStatus::RequestCanceled,
        Some(Ok(())) => HttpActionStatus::Success,
        Some(Err(error)) if is_cancellation(&error) => HttpActionStatus::RequestCanceled,
        Some(Err(error)) => {
            tracing::error!(
                target_host = %ctx.target,
                error = %error,
                "Error in sending request body"
            );
            HttpActionStatus::SendFailure
        }
    }
}

async fn get_response<E: Exchange>(
    state: &mut AttemptState<E>,
    ctx: FailureContext<'_>,
) -> HttpActionStatus {
    let cancel = state.attempt_cancel.clone();
    let Some(exchange) = state.exchange.as_mut() else {
        return HttpActionStatus::UnknownFailure;
    };

    let error = match cancellable(exchange.response(), &cancel).await {
        None => return HttpActionStatus::RequestCanceled,
        Some(Ok(response)) => {
            state.set_response(response);
            return HttpActionStatus::Success;
        }
        Some(Err(error)) => error,
    };

    let status = classify(&error, ctx);
    if status == HttpActionStatus::ProtocolError {
        // Error statuses reported as failures still carry a usable response.
        if let Some(response) = exchange.take_error_response() {
            state.set_response(response);
            return HttpActionStatus::Success;
        }
    }
    status
}

fn needs_body<E: Exchange>(request: &Request, state: &AttemptState<E>) -> bool {
    if request.method() == http::Method::HEAD {
        return false;
    }
    state
        .head
        .as_ref()
        .is_some_and(|head| head.content_length != Some(0))
}

async fn read_response_body<E: Exchange>(
    state: &mut AttemptState<E>,
    pool: &crate::buffer::BufferPool,
    limits: ReadLimits,
    ctx: FailureContext<'_>,
) -> HttpActionStatus {
    let cancel = state.attempt_cancel.clone();
    let content_length = state.head.as_ref().and_then(|head| head.content_length);
    let Some(stream) = state.body_stream.as_mut() else {
        return HttpActionStatus::Success;
    };

    let read = read_body(stream, content_length, &mut state.body, pool, limits);
    match cancellable(read, &cancel).await {
        None => HttpActionStatus::RequestCanceled,
        Some(Ok(())) => HttpActionStatus::Success,
        Some(Err(error)) if is_cancellation(&error) => HttpActionStatus::RequestCanceled,
        Some(Err(error)) => {
            tracing::error!(
                target_host = %ctx.target,
                error = %error,
                "Error in receiving response body"
            );
            HttpActionStatus::ReceiveFailure
        }
    }
}
