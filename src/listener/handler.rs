//! Handler contract between the listener pipeline and business logic.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Uri;

use crate::http::Envelope;

/// Error reported by a handler. Any error type works.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for handler invocations.
pub type HandlerResult = Result<(), HandlerError>;

/// Business logic invoked once per accepted webhook request.
///
/// Returning `Ok(())` answers the sender with `202 Accepted`; returning an
/// error answers with `500 Internal Server Error`.
///
/// Any `Fn(Arc<E>, Envelope, String, Uri) -> impl Future<Output = HandlerResult>`
/// closure implements this trait.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use webhook_listener::http::Envelope;
/// use webhook_listener::listener::{HandlerResult, ListenerHandler};
/// use axum::http::Uri;
///
/// struct Env;
///
/// fn assert_handler<H: ListenerHandler<Env>>(_: H) {}
///
/// assert_handler(|_env: Arc<Env>, envelope: Envelope, key: String, _uri: Uri| async move {
///     println!("{key}: {:?}", envelope.field("action"));
///     HandlerResult::Ok(())
/// });
/// ```
#[async_trait]
pub trait ListenerHandler<E>: Send + Sync + 'static {
    /// Handle one normalized request.
    ///
    /// * `env` - shared environment supplied at registration
    /// * `envelope` - headers and decoded body of the request
    /// * `routing_key` - key the listener was registered with
    /// * `uri` - request URI (path and query)
    async fn handle(&self, env: Arc<E>, envelope: Envelope, routing_key: String, uri: Uri)
        -> HandlerResult;
}

#[async_trait]
impl<E, F, Fut> ListenerHandler<E> for F
where
    E: Send + Sync + 'static,
    F: Fn(Arc<E>, Envelope, String, Uri) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(
        &self,
        env: Arc<E>,
        envelope: Envelope,
        routing_key: String,
        uri: Uri,
    ) -> HandlerResult {
        (self)(env, envelope, routing_key, uri).await
    }
}
