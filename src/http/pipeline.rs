//! Per-request webhook pipeline.
//!
//! # Responsibilities
//! - Read the request body in full
//! - Normalize headers and JSON body into an [`Envelope`]
//! - Invoke the listener's handler and map its outcome to a status code
//!
//! # Status Codes
//! - `202 Accepted`: handler succeeded
//! - `400 Bad Request`: empty body, unreadable body, malformed or non-object
//!   JSON, envelope encoding failure
//! - `413 Payload Too Large`: body above a configured `max_body_size`
//! - `500 Internal Server Error`: handler failed
//!
//! Failures are contained to the request: they are logged and answered, never
//! propagated to the server.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode, Uri},
};

use crate::http::envelope::{Envelope, EnvelopeError};
use crate::http::X_REQUEST_ID;
use crate::listener::ListenerEntry;
use crate::observability::metrics;

/// Axum handler serving every method and path of a listener.
pub async fn handle_webhook<E>(
    State(entry): State<Arc<ListenerEntry<E>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode
where
    E: Send + Sync + 'static,
{
    let start = Instant::now();
    let status = process(&entry, method, uri, headers, body).await;
    metrics::record_request(entry.port(), entry.routing_key(), status.as_u16(), start);
    status
}

async fn process<E>(
    entry: &ListenerEntry<E>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode
where
    E: Send + Sync + 'static,
{
    let port = entry.port();
    let routing_key = entry.routing_key();
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::info!(
        request_id = %request_id,
        port,
        routing_key,
        method = %method,
        uri = %uri,
        "Received request"
    );
    tracing::debug!(request_id = %request_id, headers = ?headers, "Request headers");

    // A body cut off by the size limit reports 413, any other read failure 400.
    let bytes = match body {
        Ok(bytes) => bytes,
        Err(rejection) => {
            let status = rejection.status();
            tracing::error!(
                request_id = %request_id,
                port,
                status = status.as_u16(),
                error = %rejection,
                "Listener can not read body"
            );
            return status;
        }
    };

    tracing::debug!(
        request_id = %request_id,
        body = %String::from_utf8_lossy(&bytes),
        "Listener received body"
    );

    let envelope = match Envelope::from_request(&headers, &bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            log_rejection(&request_id, port, &e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let encoded = match envelope.to_json() {
        Ok(encoded) => encoded,
        Err(e) => {
            log_rejection(&request_id, port, &e);
            return StatusCode::BAD_REQUEST;
        }
    };
    tracing::debug!(
        request_id = %request_id,
        envelope = %String::from_utf8_lossy(&encoded),
        "Envelope built"
    );

    let result = entry
        .handler()
        .handle(
            Arc::clone(entry.environment()),
            envelope,
            routing_key.to_string(),
            uri,
        )
        .await;

    match result {
        Ok(()) => {
            tracing::info!(request_id = %request_id, port, routing_key, "Completed event processing");
            StatusCode::ACCEPTED
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                port,
                routing_key,
                error = %e,
                "Error processing event"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn log_rejection(request_id: &str, port: u16, error: &EnvelopeError) {
    match error {
        EnvelopeError::Encode(_) => {
            tracing::error!(request_id = %request_id, port, error = %error, "Unable to encode envelope")
        }
        _ => tracing::warn!(request_id = %request_id, port, error = %error, "Rejected request"),
    }
}
