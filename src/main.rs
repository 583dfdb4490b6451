//! Webhook listener service.
//!
//! Opens every listener declared in the configuration file and logs each
//! accepted webhook event.
//!
//! # Architecture Overview
//!
//! ```text
//!     config.toml ──▶ ListenerManager ──┬──▶ :9080  listener (key "github")
//!                                        ├──▶ :9443  TLS listener (key "gitlab")
//!                                        └──▶ ...
//!
//!     webhook request ──▶ listener ──▶ pipeline ──▶ Envelope ──▶ handler
//!                                                                   │
//!     202 / 400 / 500 ◀─────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Uri;
use clap::Parser;
use serde_json::Value;
use tokio::task::{JoinError, JoinSet};

use webhook_listener::config::{load_config, ServiceConfig};
use webhook_listener::http::{Envelope, ServerSettings};
use webhook_listener::lifecycle::signals::shutdown_signal;
use webhook_listener::listener::{HandlerResult, ListenerError, ListenerManager};
use webhook_listener::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "webhook-listener", version)]
#[command(about = "Multi-port webhook listener", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive, overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

/// Environment shared with every handler invocation.
struct ServiceEnv {
    version: &'static str,
}

async fn log_event(
    env: Arc<ServiceEnv>,
    envelope: Envelope,
    routing_key: String,
    uri: Uri,
) -> HandlerResult {
    let event = envelope.header("x-github-event").unwrap_or("unknown");
    let action = envelope.field("action").and_then(Value::as_str).unwrap_or("none");
    tracing::info!(
        routing_key = %routing_key,
        uri = %uri,
        event,
        action,
        version = env.version,
        "Webhook event"
    );
    Ok(())
}

type ListenerOutcome = Result<(u16, Result<(), ListenerError>), JoinError>;

fn report(outcome: ListenerOutcome) {
    match outcome {
        Ok((port, Ok(()))) => tracing::info!(port, "Listener stopped"),
        Ok((port, Err(e))) => tracing::error!(port, error = %e, "Listener failed"),
        Err(e) => tracing::error!(error = %e, "Listener task panicked"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init(&config.observability)?;

    tracing::info!("webhook-listener v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        max_body_size = ?config.server.max_body_size,
        listeners = config.listeners.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let manager = ListenerManager::new(ServerSettings::from(&config.server));
    let env = Arc::new(ServiceEnv {
        version: env!("CARGO_PKG_VERSION"),
    });

    let mut listeners = JoinSet::new();
    for listener in config.listeners {
        let manager = manager.clone();
        let env = Arc::clone(&env);
        listeners.spawn(async move {
            let port = listener.port;
            let result = match listener.tls {
                Some(tls) => {
                    manager
                        .new_listener_tls(
                            env,
                            port,
                            listener.routing_key,
                            tls.cert_path,
                            tls.key_path,
                            log_event,
                        )
                        .await
                }
                None => {
                    manager
                        .new_listener(env, port, listener.routing_key, log_event)
                        .await
                }
            };
            (port, result)
        });
    }

    // A failed listener does not take the others down; stop on a signal or
    // once nothing is left running.
    let signal = shutdown_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            () = &mut signal => break,
            outcome = listeners.join_next() => match outcome {
                Some(outcome) => report(outcome),
                None => {
                    tracing::warn!("No listeners left running");
                    break;
                }
            },
        }
    }

    manager.shutdown();
    while let Some(outcome) = listeners.join_next().await {
        report(outcome);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
