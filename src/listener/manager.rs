//! Listener manager: registration plus server startup.

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::http::server::{self, ServerSettings};
use crate::lifecycle::Shutdown;
use crate::listener::handler::ListenerHandler;
use crate::listener::registry::{ListenerEntry, ListenerRegistry};
use crate::listener::ListenerError;
use crate::net::tls;

/// Exit status used when a TLS listener has no credentials to serve with.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Starts webhook listeners, one per port.
///
/// Each `new_listener*` call registers the port, binds it and serves until
/// [`ListenerManager::shutdown`] is called or the server fails, so callers
/// run each call on its own task. Clones share the registry and the
/// shutdown signal.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::http::Uri;
/// use webhook_listener::http::{Envelope, ServerSettings};
/// use webhook_listener::listener::{HandlerResult, ListenerManager};
///
/// struct Env;
///
/// async fn on_event(_env: Arc<Env>, envelope: Envelope, key: String, _uri: Uri) -> HandlerResult {
///     println!("{key}: {:?}", envelope.field("action"));
///     Ok(())
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let manager = ListenerManager::new(ServerSettings::default());
/// let task = tokio::spawn({
///     let manager = manager.clone();
///     async move { manager.new_listener(Arc::new(Env), 9080, "github", on_event).await }
/// });
///
/// // ... later
/// manager.shutdown();
/// task.await.unwrap().unwrap();
/// # }
/// ```
pub struct ListenerManager<E> {
    registry: ListenerRegistry<E>,
    settings: ServerSettings,
    shutdown: Shutdown,
}

impl<E> ListenerManager<E>
where
    E: Send + Sync + 'static,
{
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            registry: ListenerRegistry::new(),
            settings,
            shutdown: Shutdown::new(),
        }
    }

    pub fn registry(&self) -> &ListenerRegistry<E> {
        &self.registry
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Ask every server started by this manager to stop gracefully.
    pub fn shutdown(&self) {
        tracing::info!(listeners = self.registry.len(), "Stopping listeners");
        self.shutdown.trigger();
    }

    /// Register and serve a plain HTTP listener on `port`.
    ///
    /// Fails immediately with [`ListenerError::Registry`] when the port already
    /// has a listener. Otherwise runs until shutdown or a server failure.
    pub async fn new_listener<H>(
        &self,
        env: Arc<E>,
        port: u16,
        routing_key: impl Into<String>,
        handler: H,
    ) -> Result<(), ListenerError>
    where
        H: ListenerHandler<E>,
    {
        tracing::info!(port, "Starting listener");

        let entry = self.register(env, port, routing_key, handler)?;
        let listener = self.bind(port).await?;
        let router = server::build_router(entry, &self.settings);

        server::serve(listener, router, self.shutdown.subscribe())
            .await
            .map_err(|source| ListenerError::Serve { port, source })
    }

    /// Register and serve a TLS listener on `port`.
    ///
    /// A missing certificate or key file is fatal: it is logged and the
    /// process exits with [`FATAL_EXIT_CODE`]. Use
    /// [`ListenerManager::try_new_listener_tls`] to get the error instead.
    pub async fn new_listener_tls<H>(
        &self,
        env: Arc<E>,
        port: u16,
        routing_key: impl Into<String>,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        handler: H,
    ) -> Result<(), ListenerError>
    where
        H: ListenerHandler<E>,
    {
        if let Err(e) = tls::check_credentials(cert_path.as_ref(), key_path.as_ref()) {
            tracing::error!(port, error = %e, "Cannot start TLS listener without credentials");
            std::process::exit(FATAL_EXIT_CODE);
        }

        self.try_new_listener_tls(env, port, routing_key, cert_path, key_path, handler)
            .await
    }

    /// Register and serve a TLS listener, returning credential problems as
    /// [`ListenerError::Tls`].
    ///
    /// Credentials are loaded before the port is registered, so a rejected
    /// certificate leaves the port free.
    pub async fn try_new_listener_tls<H>(
        &self,
        env: Arc<E>,
        port: u16,
        routing_key: impl Into<String>,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        handler: H,
    ) -> Result<(), ListenerError>
    where
        H: ListenerHandler<E>,
    {
        let (cert_path, key_path) = (cert_path.as_ref(), key_path.as_ref());
        tracing::info!(
            port,
            cert_path = %cert_path.display(),
            key_path = %key_path.display(),
            "Starting TLS listener"
        );

        let tls_config = tls::load_tls_config(cert_path, key_path).await?;
        let entry = self.register(env, port, routing_key, handler)?;
        let listener = self.bind(port).await?;
        let router = server::build_router(entry, &self.settings);

        server::serve_tls(listener, tls_config, router, self.shutdown.subscribe())
            .await
            .map_err(|source| ListenerError::Serve { port, source })
    }

    fn register<H>(
        &self,
        env: Arc<E>,
        port: u16,
        routing_key: impl Into<String>,
        handler: H,
    ) -> Result<Arc<ListenerEntry<E>>, ListenerError>
    where
        H: ListenerHandler<E>,
    {
        let entry = Arc::new(ListenerEntry::new(port, routing_key, Arc::new(handler), env));
        self.registry.register(Arc::clone(&entry))?;
        Ok(entry)
    }

    async fn bind(&self, port: u16) -> Result<TcpListener, ListenerError> {
        let addr = self.settings.socket_addr(port);
        TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { port, source })
    }
}

impl<E> Clone for ListenerManager<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            settings: self.settings.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}
