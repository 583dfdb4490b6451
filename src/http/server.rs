//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router for one listener
//! - Wire up middleware (request ID, tracing, optional body limit and timeout)
//! - Serve plain HTTP or TLS until the shutdown signal fires

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::pipeline::handle_webhook;
use crate::lifecycle::shutdown;
use crate::listener::ListenerEntry;

/// How long in-flight TLS connections may drain after shutdown is requested.
const TLS_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Settings applied to every listener a manager starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// IP address listeners bind to.
    pub bind_ip: IpAddr,
    /// Maximum accepted request body, in bytes; unlimited when `None`.
    pub max_body_size: Option<usize>,
    /// Per-request deadline; none by default.
    pub request_timeout: Option<Duration>,
}

impl ServerSettings {
    /// Socket address for a listener on `port`.
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.bind_ip, port)
    }

    /// Settings bound to the loopback interface.
    pub fn localhost() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..Self::default()
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for ServerSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            bind_ip: config.bind_ip(),
            max_body_size: config.max_body_size,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Build the router serving every method and path of one listener.
#[allow(deprecated)]
pub fn build_router<E>(entry: Arc<ListenerEntry<E>>, settings: &ServerSettings) -> Router
where
    E: Send + Sync + 'static,
{
    let router = Router::new()
        .fallback(handle_webhook::<E>)
        .with_state(entry)
        .layer(DefaultBodyLimit::disable());

    let router = match settings.request_timeout {
        Some(timeout) => router.layer(TimeoutLayer::new(timeout)),
        None => router,
    };

    let router = match settings.max_body_size {
        Some(limit) => router.layer(RequestBodyLimitLayer::new(limit)),
        None => router,
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

/// Serve plain HTTP on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP server starting");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown::wait(shutdown_rx))
        .await?;

    tracing::info!(address = %addr, "HTTP server stopped");
    Ok(())
}

/// Serve HTTPS on an already bound listener.
pub async fn serve_tls(
    listener: TcpListener,
    tls_config: RustlsConfig,
    router: Router,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTPS server starting");

    let handle = axum_server::Handle::new();
    let watcher = tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown::wait(shutdown_rx).await;
            handle.graceful_shutdown(Some(TLS_GRACE_PERIOD));
        }
    });

    let result = axum_server::from_tcp_rustls(listener.into_std()?, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await;

    watcher.abort();
    result?;

    tracing::info!(address = %addr, "HTTPS server stopped");
    Ok(())
}
