//! Shared utilities for listener integration tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::Uri;
use tokio::net::TcpStream;
use webhook_listener::http::Envelope;
use webhook_listener::listener::{HandlerError, HandlerResult};

/// Environment recording every handler invocation.
#[derive(Default)]
pub struct Recorder {
    calls: AtomicUsize,
    events: Mutex<Vec<(Envelope, String, Uri)>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<(Envelope, String, Uri)> {
        self.events.lock().unwrap().clone()
    }
}

/// Handler that records the request and succeeds.
#[allow(dead_code)]
pub async fn record(env: Arc<Recorder>, envelope: Envelope, key: String, uri: Uri) -> HandlerResult {
    env.calls.fetch_add(1, Ordering::SeqCst);
    env.events.lock().unwrap().push((envelope, key, uri));
    Ok(())
}

/// Handler that records the call and fails.
#[allow(dead_code)]
pub async fn reject(env: Arc<Recorder>, _: Envelope, _: String, _: Uri) -> HandlerResult {
    env.calls.fetch_add(1, Ordering::SeqCst);
    Err(HandlerError::from("event could not be processed"))
}

/// Wait until something accepts TCP connections on `127.0.0.1:port`.
pub async fn wait_for_port(port: u16) {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("nothing listening on {addr}");
}

/// HTTP client without connection pooling or proxies.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Path of a checked-in test fixture.
#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}
