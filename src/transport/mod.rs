//! Transport engine.
//!
//! # Responsibilities
//! - Send one request to one endpoint and always come back with a [`Response`]
//! - Enforce the overall deadline, the connect deadline and the attempt ceiling
//! - Honor the caller's cancellation token at every phase
//!
//! # Data Flow
//! ```text
//! send(request, timeout, cancel)
//!     → overall-timeout racer (this file)
//!     → retry.rs (connection attempts)
//!     → attempt.rs (send body → get response → read body)
//!         → connect_timeout.rs, body.rs, classify.rs
//!     → response_builder.rs
//! ```
//!
//! # Design Decisions
//! - Generic over [`Connector`]; production uses [`HyperConnector`]
//! - Per-send state lives on the stack of `send`, so a timed-out send can
//!   still build its response from partial state after the loop is dropped
//! - An attempt that does not unwind within the abort grace period is dropped,
//!   never left running in the background

pub mod attempt;
pub mod body;
pub mod classify;
pub mod connect_timeout;
pub mod response_builder;
pub mod retry;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::buffer::BufferPool;
use crate::config::TransportConfig;
use crate::model::{Request, Response, ResponseCode};
use crate::native::http1::HyperConnector;
use crate::native::Connector;
use crate::observability::metrics;
use crate::resilience::{race, Race};
use crate::transport::response_builder::build_response;
use crate::transport::state::AttemptState;

/// Sends a request to a single endpoint.
///
/// Implementations never fail: transport problems come back as responses with
/// synthetic codes (see [`ResponseCode`]).
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Response> + Send;
}

/// The resilient HTTP transport.
pub struct HttpTransport<C = HyperConnector> {
    config: TransportConfig,
    connector: C,
    buffers: BufferPool,
}

impl HttpTransport<HyperConnector> {
    /// Transport over plain HTTP/1.1 connections.
    pub fn new(config: TransportConfig) -> Self {
        let connector = HyperConnector::new(&config.connection);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> HttpTransport<C> {
    pub fn with_connector(config: TransportConfig, connector: C) -> Self {
        let buffers = BufferPool::new(
            config.buffers.preferred_read_size,
            config.buffers.max_pooled_buffers,
        );
        Self {
            config,
            connector,
            buffers,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Read buffers shared by every send of this transport.
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffers
    }

    /// Send with the configured default timeout and no external cancellation.
    pub async fn send_request(&self, request: &Request) -> Response {
        let timeout = self.config.connection.default_timeout();
        self.send(request, timeout, &CancellationToken::new()).await
    }

    async fn send_with_deadline(
        &self,
        request: &Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Response {
        if timeout < Duration::from_millis(1) {
            log_request_timeout(request, timeout);
            return Response::new(ResponseCode::REQUEST_TIMEOUT);
        }

        let request_cancel = cancel.child_token();
        let mut state = AttemptState::new(timeout, request_cancel.clone());

        let mut timed_out = false;
        let completed = {
            let mut work = pin!(self.send_with_retries(request, &mut state));
            match race(work.as_mut(), timeout).await {
                Race::Completed(response) => Some(response),
                Race::Elapsed => {
                    timed_out = true;
                    request_cancel.cancel();
                    log_request_timeout(request, timeout);

                    let grace = self.config.connection.request_abort_timeout();
                    match tokio::time::timeout(grace, work.as_mut()).await {
                        Ok(unwound) => Some(unwound),
                        Err(_) => {
                            tracing::warn!(
                                target_host = %request.authority(),
                                grace_ms = grace.as_millis() as u64,
                                "Timed out request was aborted but did not complete in time"
                            );
                            None
                        }
                    }
                }
            }
        };

        // A timed-out send reports whatever partial state is left.
        let response = match completed {
            Some(response) if !timed_out => response,
            Some(response) if state.head.is_none() => {
                response.with_code(ResponseCode::REQUEST_TIMEOUT)
            }
            _ => build_response(ResponseCode::REQUEST_TIMEOUT, &mut state),
        };
        state.release();
        response
    }
}

impl<C: Connector> Transport for HttpTransport<C> {
    async fn send(
        &self,
        request: &Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Response {
        let started = Instant::now();
        let response = self.send_with_deadline(request, timeout, cancel).await;

        if self.config.observability.metrics_enabled {
            metrics::record_request(request, response.code(), started.elapsed());
            metrics::record_buffers_outstanding(self.buffers.outstanding());
        }
        response
    }
}

fn log_request_timeout(request: &Request, timeout: Duration) {
    tracing::error!(
        target_host = %request.authority(),
        timeout_secs = timeout.as_secs_f64(),
        "Request timed out"
    );
}
