//! Per-request tracing span.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::field::Empty;
use tracing::Instrument;
use uuid::Uuid;

use crate::model::url_ext::url_without_query;
use crate::model::{Request, Response};
use crate::transport::Transport;

/// Wraps every send in an `http-client` span.
///
/// The span carries the request id, the URL without its query, the method and
/// content length; `http.code` and the response content length are recorded
/// once the inner transport returns.
#[derive(Debug, Clone)]
pub struct TransportWithTracing<T> {
    inner: T,
}

impl<T: Transport> TransportWithTracing<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for TransportWithTracing<T> {
    async fn send(
        &self,
        request: &Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Response {
        let span = tracing::info_span!(
            "http-client",
            kind = "http-client",
            component = "cluster-client",
            request_id = %Uuid::new_v4(),
            http.url = %url_without_query(request.url()),
            http.method = %request.method(),
            http.request_content_length = Empty,
            http.code = Empty,
            http.response_content_length = Empty,
        );
        if let Some(content) = request.content() {
            span.record("http.request_content_length", content.len() as u64);
        }

        let response = self
            .inner
            .send(request, timeout, cancel)
            .instrument(span.clone())
            .await;

        span.record("http.code", response.code().as_u16());
        span.record(
            "http.response_content_length",
            response.content_length() as u64,
        );
        response
    }
}
