//! Connect-timeout prober.
//!
//! # Responsibilities
//! - Decide whether a phase should race the connect deadline at all
//! - Tell "still connecting" apart from "connected but slow" when it fires
//!
//! # Design Decisions
//! - Engages only when the overall budget can fit the connect deadline, the
//!   target is remote, and the socket is not already up (reused connection)
//! - On expiry only the current attempt is cancelled; the send may retry

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ConnectTimeoutConfig;
use crate::model::Request;
use crate::native::{Exchange, SocketProbe};
use crate::resilience::{race, Race};
use crate::transport::classify::{FailureContext, HttpActionStatus};
use crate::transport::state::AttemptState;

/// An armed connect deadline for one phase.
#[derive(Debug)]
pub(crate) struct ConnectProbe {
    socket: SocketProbe,
    timeout: Duration,
    attempt_cancel: CancellationToken,
}

/// Arm the prober if every precondition holds.
pub(crate) fn connect_probe<E: Exchange>(
    config: &ConnectTimeoutConfig,
    supports_socket_probe: bool,
    request: &Request,
    state: &AttemptState<E>,
) -> Option<ConnectProbe> {
    if !config.enabled || !supports_socket_probe {
        return None;
    }
    let timeout = config.timeout();
    if state.time_remaining() < timeout || request.is_loopback() {
        return None;
    }
    let socket = state.exchange.as_ref()?.socket();
    if socket.is_connected() {
        return None;
    }

    Some(ConnectProbe {
        socket,
        timeout,
        attempt_cancel: state.attempt_cancel.clone(),
    })
}

/// Run `phase`, racing it against the connect deadline when a probe is armed.
pub(crate) async fn limit_connect_time<F>(
    probe: Option<ConnectProbe>,
    phase: F,
    ctx: FailureContext<'_>,
) -> HttpActionStatus
where
    F: Future<Output = HttpActionStatus>,
{
    let Some(probe) = probe else {
        return phase.await;
    };

    let mut phase = pin!(phase);
    match race(phase.as_mut(), probe.timeout).await {
        Race::Completed(status) => status,
        Race::Elapsed if probe.socket.is_connected() => phase.await,
        Race::Elapsed => {
            probe.attempt_cancel.cancel();
            tracing::error!(
                target_host = %ctx.target,
                attempt = ctx.attempt,
                max_attempts = ctx.max_attempts,
                timeout_ms = probe.timeout.as_millis() as u64,
                "Connection failure: connection attempt timed out"
            );
            HttpActionStatus::ConnectionFailure
        }
    }
}
