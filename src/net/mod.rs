//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listener registration
//!     → tls.rs (credential checks, rustls config) for TLS listeners
//!     → Hand off to HTTP layer (plain TcpListener or axum-server rustls acceptor)
//! ```

pub mod tls;

pub use tls::{check_credentials, load_tls_config, TlsError};
