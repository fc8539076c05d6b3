use chrono::{DateTime, Utc};
use meterline_core::types::ConnectionClass;
use serde::{Deserialize, Serialize};

/// What triggered a sync execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Periodic,
    BatchThreshold,
    NetworkChange,
    Manual,
    EndOfShift,
    BackgroundAgent,
}

/// Summary of a completed sync execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSummary {
    pub trigger: SyncTrigger,
    pub readings_synced: usize,
    pub exceptions_synced: usize,
    /// Readings the backend rejected; they stay pending locally.
    pub failed_readings: usize,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of an explicit user-invoked sync.
///
/// Each case is a distinct, non-throwing result; only local-infrastructure
/// failures surface as errors.
#[derive(Debug, Clone)]
pub enum ManualSyncOutcome {
    Completed(SyncSummary),
    NothingPending,
    AlreadyRunning,
    Disabled,
    Offline,
}

/// Outcome of the forced end-of-shift push.
#[derive(Debug, Clone)]
pub enum EndShiftOutcome {
    Completed(SyncSummary),
    /// All attempts failed. Every record is still safe in the local store
    /// and must be pushed on a later attempt.
    Failed {
        attempts: u32,
        pending_readings: u64,
        pending_exceptions: u64,
        last_error: String,
    },
}

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub pending_readings: u64,
    pub pending_exceptions: u64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub is_syncing: bool,
    pub next_periodic_at: Option<DateTime<Utc>>,
    pub connection: ConnectionClass,
    pub can_sync: bool,
}
