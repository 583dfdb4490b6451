//! Stop signal shared by every listener a manager starts.

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to listener servers.
///
/// Each server holds its own receiver and drains in-flight requests once the
/// signal fires. Clones send on the same channel, so any clone of a
/// `ListenerManager` can stop listeners started through another.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for a server about to start serving.
    ///
    /// Servers subscribing after [`Shutdown::trigger`] never see the signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscribed server to stop. A no-op when none are running.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Servers currently waiting on the signal.
    pub fn listeners_waiting(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Completes when the stop signal arrives, or when every sender is dropped.
pub async fn wait(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}
