//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limits and timeouts > 0, ports valid)
//! - Detect listeners competing for the same port
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.bind_address '{0}' is not a valid IP address")]
    InvalidBindAddress(String),

    #[error("server.max_body_size, when set, must be greater than zero")]
    ZeroBodyLimit,

    #[error("server.request_timeout_secs must be greater than zero when set")]
    ZeroTimeout,

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("no listeners configured")]
    NoListeners,

    #[error("listener #{index}: port must be greater than zero")]
    ZeroPort { index: usize },

    #[error("listener on port {port}: routing_key must not be empty")]
    EmptyRoutingKey { port: u16 },

    #[error("listener on port {port}: tls.{field} must not be empty")]
    EmptyTlsPath { port: u16, field: &'static str },

    #[error("port {0} is assigned to more than one listener")]
    DuplicatePort(u16),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.server.bind_address.clone(),
        ));
    }
    if config.server.max_body_size == Some(0) {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.server.request_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.listeners.is_empty() {
        errors.push(ValidationError::NoListeners);
    }

    let mut seen = HashSet::new();
    for (index, listener) in config.listeners.iter().enumerate() {
        if listener.port == 0 {
            errors.push(ValidationError::ZeroPort { index });
        } else if !seen.insert(listener.port) {
            errors.push(ValidationError::DuplicatePort(listener.port));
        }

        if listener.routing_key.trim().is_empty() {
            errors.push(ValidationError::EmptyRoutingKey { port: listener.port });
        }

        if let Some(tls) = &listener.tls {
            if tls.cert_path.is_empty() {
                errors.push(ValidationError::EmptyTlsPath {
                    port: listener.port,
                    field: "cert_path",
                });
            }
            if tls.key_path.is_empty() {
                errors.push(ValidationError::EmptyTlsPath {
                    port: listener.port,
                    field: "key_path",
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
