//! Pool of fixed-size read buffers.
//!
//! # Responsibilities
//! - Hand out reusable byte buffers for copying response bytes off the socket
//! - Return buffers on every exit path (guard drop), including cancellation
//! - Bound the number of idle buffers kept around

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Inner {
    buffer_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<Box<[u8]>>>,
    /// Buffers currently checked out.
    outstanding: AtomicUsize,
}

/// Shared pool of equally sized byte buffers. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl BufferPool {
    /// Create a pool of `buffer_size`-byte buffers keeping at most `max_idle` idle.
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer_size: buffer_size.max(1),
                max_idle,
                idle: Mutex::new(Vec::new()),
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Check out a buffer. Allocates when no idle buffer is available.
    pub fn acquire(&self) -> PooledBuffer {
        let reused = self
            .inner
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop());
        let buffer =
            reused.unwrap_or_else(|| vec![0u8; self.inner.buffer_size].into_boxed_slice());

        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        PooledBuffer {
            buffer: Some(buffer),
            pool: Arc::clone(&self.inner),
        }
    }

    /// Size of every buffer in the pool.
    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Number of buffers currently checked out.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Number of idle buffers ready for reuse.
    pub fn idle(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

/// A checked-out buffer. Returns itself to the pool when dropped.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Option<Box<[u8]>>,
    pool: Arc<Inner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.outstanding.fetch_sub(1, Ordering::SeqCst);

        let Some(buffer) = self.buffer.take() else {
            return;
        };
        if let Ok(mut idle) = self.pool.idle.lock() {
            if idle.len() < self.pool.max_idle {
                idle.push(buffer);
            }
        }
        tracing::trace!(outstanding = self.pool.outstanding.load(Ordering::Relaxed), "Read buffer released");
    }
}
