//! Distributed-context propagation.
//!
//! # Responsibilities
//! - Hold string properties that flow with a logical operation
//! - Copy the whitelisted ones into outgoing request headers
//!
//! # Design Decisions
//! - The ambient context is a tokio task-local, set with [`DistributedContext::scope`]
//! - Header name `x-distributed-context-<key>`, value `string|<value>`, both
//!   url-encoded with lowercase escapes
//! - Headers already present on the request are never overwritten

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::model::{Request, Response};
use crate::transport::Transport;

/// Prefix of every distributed-context header.
pub const HEADER_PREFIX: &str = "x-distributed-context-";

tokio::task_local! {
    static CURRENT: DistributedContext;
}

/// Properties of the current logical operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributedContext {
    distributed: BTreeSet<String>,
    properties: BTreeMap<String, String>,
}

impl DistributedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as one that crosses process boundaries.
    pub fn distribute(mut self, key: impl Into<String>) -> Self {
        self.distributed.insert(key.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whitelisted properties that have a value.
    pub fn distributed_properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.distributed.iter().filter_map(|key| {
            self.properties
                .get(key)
                .map(|value| (key.as_str(), value.as_str()))
        })
    }

    /// Run `future` with `self` as the ambient context.
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        CURRENT.scope(self, future).await
    }

    /// The ambient context, empty outside any [`scope`](Self::scope).
    pub fn current() -> Self {
        CURRENT.try_with(Clone::clone).unwrap_or_default()
    }
}

/// Adds distributed-context headers before delegating.
#[derive(Debug, Clone)]
pub struct TransportWithDistributedContext<T> {
    inner: T,
}

impl<T: Transport> TransportWithDistributedContext<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for TransportWithDistributedContext<T> {
    async fn send(
        &self,
        request: &Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Response {
        let context = DistributedContext::current();
        match with_context_headers(request, &context) {
            Some(enriched) => self.inner.send(&enriched, timeout, cancel).await,
            None => self.inner.send(request, timeout, cancel).await,
        }
    }
}

/// `None` when nothing needs to be added.
fn with_context_headers(request: &Request, context: &DistributedContext) -> Option<Request> {
    let mut enriched: Option<Request> = None;

    for (key, value) in context.distributed_properties() {
        let name = format!("{}{}", HEADER_PREFIX, encode(key)).to_ascii_lowercase();
        if request.headers().contains_key(name.as_str()) {
            continue;
        }
        let value = format!("string|{}", encode(value));

        let base = enriched.take().unwrap_or_else(|| request.clone());
        enriched = Some(match base.clone().with_header(&name, &value) {
            Ok(with_header) => with_header,
            Err(error) => {
                tracing::warn!(key, error = %error, "Skipping distributed context property");
                base
            }
        });
    }

    enriched
}

fn encode(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes())
        .map(|piece| {
            if piece.starts_with('%') {
                piece.to_ascii_lowercase()
            } else {
                piece.to_string()
            }
        })
        .collect()
}
