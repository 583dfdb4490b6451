//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Port opened when the config file declares no listeners.
pub const DEFAULT_PORT: u16 = 9443;

/// Routing key of the default listener.
pub const DEFAULT_ROUTING_KEY: &str = "github";

/// Root configuration for the webhook listener service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Settings shared by every listener.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Listeners to open at startup, one per port.
    pub listeners: Vec<ListenerConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            listeners: vec![ListenerConfig::default()],
        }
    }
}

/// Settings applied to every listener the manager starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address listeners bind to (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Maximum request body size in bytes. Bodies of any size are accepted
    /// when unset.
    pub max_body_size: Option<usize>,

    /// Per-request deadline in seconds. No deadline when unset.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            max_body_size: None,
            request_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Bind IP, falling back to all interfaces when the address does not parse.
    ///
    /// Validation rejects unparsable addresses before this is reached.
    pub fn bind_ip(&self) -> IpAddr {
        self.bind_address
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// Request timeout as a `Duration`, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// A single webhook listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Port to bind.
    pub port: u16,

    /// Opaque key handed to the handler with every request.
    pub routing_key: String,

    /// Optional TLS configuration.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for a listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].port, DEFAULT_PORT);
        assert_eq!(config.listeners[0].routing_key, DEFAULT_ROUTING_KEY);
        assert!(config.server.max_body_size.is_none());
        assert!(config.server.request_timeout().is_none());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn parses_listeners_with_tls() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [server]
            bind_address = "127.0.0.1"
            max_body_size = 26214400
            request_timeout_secs = 15

            [observability]
            log_format = "json"

            [[listeners]]
            port = 9080
            routing_key = "github"

            [[listeners]]
            port = 9443
            routing_key = "gitlab"
            [listeners.tls]
            cert_path = "/etc/tls/tls.crt"
            key_path = "/etc/tls/tls.key"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_ip(), "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(config.server.max_body_size, Some(25 * 1024 * 1024));
        assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listeners.len(), 2);
        assert!(config.listeners[0].tls.is_none());
        let tls = config.listeners[1].tls.as_ref().unwrap();
        assert_eq!(tls.cert_path, "/etc/tls/tls.crt");
        assert_eq!(tls.key_path, "/etc/tls/tls.key");
    }
}
