//! Connection-attempt loop.
//!
//! # Design Decisions
//! - Only connection-level failures start another attempt; anything else is
//!   final because the request may already have reached the server
//! - Attempt N is released before attempt N+1 creates its exchange
//! - No backoff: a cluster client above this layer picks the next replica

use crate::model::{Request, Response, ResponseCode};
use crate::native::Connector;
use crate::observability::metrics;
use crate::transport::attempt::AttemptOutcome;
use crate::transport::classify::FailureContext;
use crate::transport::state::AttemptState;
use crate::transport::HttpTransport;

impl<C: Connector> HttpTransport<C> {
    pub(crate) async fn send_with_retries(
        &self,
        request: &Request,
        state: &mut AttemptState<C::Exchange>,
    ) -> Response {
        let max_attempts = self.config.connection.connection_attempts.max(1);
        let target = request.authority();

        for attempt in 1..=max_attempts {
            if state.request_cancelled() {
                return Response::new(ResponseCode::CANCELED);
            }

            state.reset();
            state.attempt = attempt;
            state.exchange = Some(self.connector.create(request, state.time_remaining()));

            tracing::debug!(
                target_host = %target,
                attempt,
                max_attempts,
                "Starting connection attempt"
            );

            let ctx = FailureContext {
                target: &target,
                attempt,
                max_attempts,
            };
            match self.run_attempt(request, state, ctx).await {
                AttemptOutcome::Retry => {
                    self.record_attempt("connection_failure");
                }
                AttemptOutcome::Done(response) => {
                    self.record_attempt("completed");
                    return response;
                }
            }
        }

        state.release();
        Response::new(ResponseCode::CONNECT_FAILURE)
    }

    fn record_attempt(&self, outcome: &'static str) {
        if self.config.observability.metrics_enabled {
            metrics::record_connection_attempt(outcome);
        }
    }
}
