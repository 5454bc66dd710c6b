//! Keep-alive connection pool.
//!
//! # Responsibilities
//! - Park HTTP/1.1 senders whose previous exchange completed cleanly
//! - Hand them out again for the same authority while they are fresh
//! - Drop closed and expired connections, for every authority, and forget
//!   authorities with nothing parked
//!
//! # Design Decisions
//! - A sender only returns to the pool once hyper reports it ready, i.e. after
//!   the previous response body was fully consumed
//! - Idle lists are per authority; the map is a `DashMap` to avoid a global lock
//! - Sweeps piggyback on `checkin` at most once per sweep interval; there is no
//!   timer task

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Upper bound on the time between two sweeps of the whole pool.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Idle<T> {
    conn: T,
    since: Instant,
}

impl<T: Poolable> Idle<T> {
    fn is_reusable(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.duration_since(self.since) <= idle_timeout && self.conn.is_open()
    }
}

/// Pooled connection handle.
pub trait Poolable: Send + 'static {
    /// True when the underlying connection can take another request.
    fn is_open(&self) -> bool;
}

/// Per-authority pool of idle connections. Cloning shares the pool.
#[derive(Debug)]
pub struct ConnectionPool<T> {
    idle: Arc<DashMap<String, Vec<Idle<T>>>>,
    last_sweep: Arc<Mutex<Instant>>,
    max_idle_per_host: usize,
    idle_timeout: Duration,
}

impl<T> Clone for ConnectionPool<T> {
    fn clone(&self) -> Self {
        Self {
            idle: Arc::clone(&self.idle),
            last_sweep: Arc::clone(&self.last_sweep),
            max_idle_per_host: self.max_idle_per_host,
            idle_timeout: self.idle_timeout,
        }
    }
}

impl<T: Poolable> ConnectionPool<T> {
    pub fn new(max_idle_per_host: usize, idle_timeout: Duration) -> Self {
        Self {
            idle: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
            max_idle_per_host,
            idle_timeout,
        }
    }

    /// Take the most recently parked live connection for `key`.
    pub fn checkout(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let found = {
            let mut entry = self.idle.get_mut(key)?;
            let mut found = None;
            while let Some(idle) = entry.pop() {
                if idle.is_reusable(now, self.idle_timeout) {
                    found = Some(idle.conn);
                    break;
                }
                tracing::trace!(authority = %key, "Discarding stale idle connection");
            }
            found
        };
        self.idle.remove_if(key, |_, list| list.is_empty());
        found
    }

    /// Park a connection for reuse. Returns false when the pool is full.
    pub fn checkin(&self, key: &str, conn: T) -> bool {
        if self.max_idle_per_host == 0 || !conn.is_open() {
            return false;
        }
        self.maybe_sweep();

        let mut entry = self.idle.entry(key.to_string()).or_default();
        if entry.len() >= self.max_idle_per_host {
            return false;
        }
        entry.push(Idle {
            conn,
            since: Instant::now(),
        });
        true
    }

    /// Drop closed and expired connections everywhere and forget empty
    /// authorities. Returns the number of connections dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut dropped = 0;
        self.idle.retain(|_, list| {
            let before = list.len();
            list.retain(|idle| idle.is_reusable(now, self.idle_timeout));
            dropped += before - list.len();
            !list.is_empty()
        });
        if dropped > 0 {
            tracing::debug!(dropped, "Swept stale idle connections");
        }
        dropped
    }

    fn maybe_sweep(&self) {
        let interval = self.idle_timeout.min(MAX_SWEEP_INTERVAL);
        let due = match self.last_sweep.try_lock() {
            Ok(mut last) if last.elapsed() >= interval => {
                *last = Instant::now();
                true
            }
            // Another checkin is already sweeping, or it is not time yet.
            _ => false,
        };
        if due {
            self.sweep();
        }
    }

    /// Number of idle connections for `key`.
    pub fn idle_count(&self, key: &str) -> usize {
        self.idle.get(key).map_or(0, |entry| entry.len())
    }

    /// Number of authorities with at least one parked connection.
    pub fn authorities(&self) -> usize {
        self.idle.len()
    }
}
