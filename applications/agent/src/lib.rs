//! Meterline Agent
//!
//! Host-scheduled background sync pass. The host platform wakes this
//! binary when background execution is granted; it runs one bulk sync
//! with the same engine the foreground uses, sweeps old synced records,
//! records the outcome in the shared `sync_state` row, and exits. A
//! non-zero exit asks the host scheduler to retry later.

pub mod config;
pub mod error;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
