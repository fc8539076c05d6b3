//! Typed publish-subscribe for sync status events.
//!
//! Observer list with explicit unsubscribe tokens. Each emitted event is
//! delivered exactly once per live listener, in subscription order, and a
//! panicking listener never breaks delivery to the others.

use chrono::{DateTime, Utc};
use meterline_core::types::ConnectionClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

use crate::types::SyncTrigger;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEventKind {
    Started {
        trigger: SyncTrigger,
    },
    Progress {
        readings: usize,
        exceptions: usize,
    },
    Completed {
        readings_synced: usize,
        exceptions_synced: usize,
        failed_readings: usize,
    },
    Failed {
        message: String,
    },
    /// A subset of the batch was rejected and stays pending.
    Partial {
        failed_readings: usize,
    },
    NetworkChange {
        connection: ConnectionClass,
    },
}

/// A sync status event as delivered to UI listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SyncEvent {
    pub fn now(kind: SyncEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

type Listener = Box<dyn Fn(&SyncEvent) + Send + Sync>;
type Listeners = Mutex<BTreeMap<u64, Arc<Listener>>>;

/// Multi-listener event dispatcher.
#[derive(Default)]
pub struct EventBus {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; dropping or consuming the returned token
    /// unsubscribes it.
    pub fn on(&self, listener: impl Fn(&SyncEvent) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .insert(id, Arc::new(Box::new(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver an event to every live listener.
    pub fn emit(&self, event: &SyncEvent) {
        // Snapshot under the lock, call outside it, so a listener that
        // subscribes or unsubscribes during delivery cannot deadlock.
        let snapshot: Vec<Arc<Listener>> = self
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .values()
            .cloned()
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(event = ?event.kind, "Sync event listener panicked");
            }
        }
    }
}

/// Unsubscribe token returned by [`EventBus::on`].
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Remove the listener. Dropping the token does the same.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .expect("listener registry poisoned")
                .remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collecting_listener(
        log: &Arc<Mutex<Vec<SyncEventKind>>>,
    ) -> impl Fn(&SyncEvent) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |event| log.lock().unwrap().push(event.kind.clone())
    }

    #[test]
    fn delivers_to_all_listeners_once() {
        let bus = EventBus::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let _a = bus.on(collecting_listener(&first));
        let _b = bus.on(collecting_listener(&second));

        bus.emit(&SyncEvent::now(SyncEventKind::Progress {
            readings: 3,
            exceptions: 1,
        }));

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sub = bus.on(collecting_listener(&log));
        bus.emit(&SyncEvent::now(SyncEventKind::Failed {
            message: "x".into(),
        }));
        sub.unsubscribe();
        bus.emit(&SyncEvent::now(SyncEventKind::Failed {
            message: "y".into(),
        }));

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn panicking_listener_does_not_break_others() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _bad = bus.on(|_event| panic!("listener bug"));
        let _good = bus.on(collecting_listener(&log));

        bus.emit(&SyncEvent::now(SyncEventKind::Progress {
            readings: 1,
            exceptions: 0,
        }));
        bus.emit(&SyncEvent::now(SyncEventKind::Progress {
            readings: 2,
            exceptions: 0,
        }));

        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
