//! Meterline Sync
//!
//! The sync coordinator: decides when pending local records are pushed to
//! the backend and executes the push, exactly once at a time, with bounded
//! retries and observable progress.
//!
//! Five trigger strategies funnel into the same execution path: a periodic
//! timer, a batch-size threshold checked after each capture, an
//! opportunistic trigger on wifi, an explicit manual call, and a forced
//! end-of-shift push with exponential backoff. All dependencies (store
//! pool, transport, connectivity probe, sleep) are injected at
//! construction so isolated instances can be tested with in-memory fakes.

mod config;
mod error;
mod events;
mod manager;
mod probe;
mod sleeper;
mod state;
mod types;

// Public exports
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use events::{EventBus, Subscription, SyncEvent, SyncEventKind};
pub use manager::{SyncContext, SyncManager};
pub use probe::{ConnectivityProbe, SharedConnectivity};
pub use sleeper::{Sleeper, TokioSleeper};
pub use state::{StateManager, SyncStateSnapshot};
pub use types::{EndShiftOutcome, ManualSyncOutcome, SyncStatus, SyncSummary, SyncTrigger};
