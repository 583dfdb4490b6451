//! Listener registry and manager.
//!
//! # Data Flow
//! ```text
//! new_listener(env, port, key, handler)
//!     → registry.rs (one listener per port)
//!     → bind port (plain, or TLS after credential checks)
//!     → http::server serves http::pipeline until shutdown
//! ```
//!
//! # Design Decisions
//! - Registration and serving are one call; it runs for the server's lifetime
//! - Callers wanting several listeners spawn one task per call
//! - The environment is injected at registration and shared read-only

pub mod handler;
pub mod manager;
pub mod registry;

use thiserror::Error;

use crate::net::TlsError;

pub use handler::{HandlerError, HandlerResult, ListenerHandler};
pub use manager::ListenerManager;
pub use registry::{ListenerEntry, ListenerRegistry, RegistryError};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("server on port {port} failed: {source}")]
    Serve {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
