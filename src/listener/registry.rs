//! Port → listener registry.
//!
//! # Responsibilities
//! - Track which ports have a listener registered
//! - Reject a second registration for an occupied port
//!
//! # Design Decisions
//! - One mutex guards the whole map; it is held only for check-and-insert
//! - Write-once per port: entries live until the process exits

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::listener::handler::ListenerHandler;
use crate::observability::metrics;

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("listener on port {0} already exists")]
    PortInUse(u16),
}

/// Everything a running listener needs to serve requests.
pub struct ListenerEntry<E> {
    port: u16,
    routing_key: String,
    handler: Arc<dyn ListenerHandler<E>>,
    environment: Arc<E>,
}

impl<E> ListenerEntry<E>
where
    E: Send + Sync + 'static,
{
    pub fn new(
        port: u16,
        routing_key: impl Into<String>,
        handler: Arc<dyn ListenerHandler<E>>,
        environment: Arc<E>,
    ) -> Self {
        Self {
            port,
            routing_key: routing_key.into(),
            handler,
            environment,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn handler(&self) -> &Arc<dyn ListenerHandler<E>> {
        &self.handler
    }

    pub fn environment(&self) -> &Arc<E> {
        &self.environment
    }
}

impl<E> fmt::Debug for ListenerEntry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("port", &self.port)
            .field("routing_key", &self.routing_key)
            .finish_non_exhaustive()
    }
}

/// Concurrency-safe map from port to registered listener.
///
/// Cloning is cheap; clones share the same map.
pub struct ListenerRegistry<E> {
    listeners: Arc<Mutex<HashMap<u16, Arc<ListenerEntry<E>>>>>,
}

impl<E> ListenerRegistry<E>
where
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a listener under its port.
    ///
    /// Fails with [`RegistryError::PortInUse`] and leaves the map untouched
    /// when the port already has a listener.
    pub fn register(&self, entry: Arc<ListenerEntry<E>>) -> Result<(), RegistryError> {
        let port = entry.port();
        let count = {
            let mut listeners = self.lock();
            match listeners.entry(port) {
                Entry::Occupied(_) => return Err(RegistryError::PortInUse(port)),
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
            listeners.len()
        };

        metrics::record_listener_count(count);
        tracing::debug!(port, registered = count, "Listener registered");
        Ok(())
    }

    /// Whether a listener is registered on `port`.
    pub fn contains(&self, port: u16) -> bool {
        self.lock().contains_key(&port)
    }

    /// Registered listener for `port`.
    pub fn get(&self, port: u16) -> Option<Arc<ListenerEntry<E>>> {
        self.lock().get(&port).cloned()
    }

    /// Registered ports, ascending.
    pub fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.lock().keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<u16, Arc<ListenerEntry<E>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<E> Default for ListenerRegistry<E>
where
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
