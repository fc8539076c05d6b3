//! Connectivity detection seam.
//!
//! The platform layer feeds interface changes into a [`SharedConnectivity`];
//! the coordinator only ever sees the [`ConnectivityProbe`] trait, so tests
//! can drive connectivity transitions directly.

use meterline_core::types::ConnectionClass;
use tokio::sync::watch;

/// Read and watch the current connection class.
pub trait ConnectivityProbe: Send + Sync {
    fn current(&self) -> ConnectionClass;

    /// A receiver that yields on every class change.
    fn subscribe(&self) -> watch::Receiver<ConnectionClass>;
}

/// Watch-channel backed probe the host updates from platform callbacks.
pub struct SharedConnectivity {
    tx: watch::Sender<ConnectionClass>,
}

impl SharedConnectivity {
    pub fn new(initial: ConnectionClass) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Record an interface change; watchers wake only on actual changes.
    pub fn set(&self, class: ConnectionClass) {
        self.tx.send_if_modified(|current| {
            if *current == class {
                false
            } else {
                *current = class;
                true
            }
        });
    }
}

impl ConnectivityProbe for SharedConnectivity {
    fn current(&self) -> ConnectionClass {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionClass> {
        self.tx.subscribe()
    }
}
