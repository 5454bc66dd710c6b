//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts ≥ 1, sizes > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransportConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::TransportConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &TransportConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.connection.connection_attempts == 0 {
        errors.push(ValidationError::new(
            "connection.connection_attempts",
            "must be at least 1",
        ));
    }
    if config.connection.default_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "connection.default_timeout_ms",
            "must be greater than 0",
        ));
    }
    if config.connect_timeout.enabled && config.connect_timeout.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "connect_timeout.timeout_ms",
            "must be greater than 0 when the connect timeout is enabled",
        ));
    }
    if config.buffers.preferred_read_size == 0 {
        errors.push(ValidationError::new(
            "buffers.preferred_read_size",
            "must be greater than 0",
        ));
    }
    if config.buffers.large_object_threshold == 0 {
        errors.push(ValidationError::new(
            "buffers.large_object_threshold",
            "must be greater than 0",
        ));
    }
    if config.buffers.max_pooled_buffers == 0 {
        errors.push(ValidationError::new(
            "buffers.max_pooled_buffers",
            "must be at least 1",
        ));
    }
    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
