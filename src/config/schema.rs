//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the transport.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the transport.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransportConfig {
    /// Connection attempts, default timeout and keep-alive settings.
    pub connection: ConnectionConfig,

    /// Connect-phase deadline.
    pub connect_timeout: ConnectTimeoutConfig,

    /// Response body buffering.
    pub buffers: BufferConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum connection attempts per send (at least 1).
    pub connection_attempts: u32,

    /// Overall timeout used when the caller does not pass one, in milliseconds.
    pub default_timeout_ms: u64,

    /// How long a timed-out send waits for its attempt to unwind, in milliseconds.
    pub request_abort_timeout_ms: u64,

    /// Idle keep-alive connections kept per target authority.
    pub max_idle_per_host: usize,

    /// Idle keep-alive connections older than this are discarded, in seconds.
    pub idle_timeout_secs: u64,

    /// Set `TCP_NODELAY` on new connections.
    pub tcp_nodelay: bool,
}

impl ConnectionConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn request_abort_timeout(&self) -> Duration {
        Duration::from_millis(self.request_abort_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_attempts: 3,
            default_timeout_ms: 30_000,
            request_abort_timeout_ms: 250,
            max_idle_per_host: 32,
            idle_timeout_secs: 60,
            tcp_nodelay: true,
        }
    }
}

/// Connect-timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectTimeoutConfig {
    /// Race the connect phase against `timeout_ms`.
    pub enabled: bool,

    /// Connect-phase deadline in milliseconds.
    pub timeout_ms: u64,
}

impl ConnectTimeoutConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ConnectTimeoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 750,
        }
    }
}

/// Response body buffering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Chunk size for socket reads and size of pooled buffers, in bytes.
    pub preferred_read_size: usize,

    /// Bodies of at least this many bytes are read through a pooled buffer.
    pub large_object_threshold: usize,

    /// Idle pooled buffers kept for reuse.
    pub max_pooled_buffers: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            preferred_read_size: 16 * 1024,
            large_object_threshold: 85_000,
            max_pooled_buffers: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Record metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}
