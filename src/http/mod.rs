//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace, body limit)
//!     → pipeline.rs (read body, build envelope, invoke handler)
//!     → envelope.rs (headers + JSON body → Envelope)
//!     → status code back to the webhook sender
//! ```

pub mod envelope;
pub mod pipeline;
pub mod server;

pub use envelope::{Envelope, EnvelopeError};
pub use server::ServerSettings;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
