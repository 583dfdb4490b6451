//! Multi-port webhook listener library.
//!
//! Registers HTTP(S) listeners, one per port, each bound to an opaque routing
//! key and a handler. Every inbound request is normalized into an
//! [`http::Envelope`] (headers + JSON body) before the handler sees it.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod listener;
pub mod net;
pub mod observability;

pub use config::ServiceConfig;
pub use http::{Envelope, ServerSettings};
pub use lifecycle::Shutdown;
pub use listener::{ListenerError, ListenerHandler, ListenerManager};
