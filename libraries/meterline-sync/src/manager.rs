//! The sync coordinator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use meterline_client::{BulkSyncRequest, BulkSyncTransport, ExceptionPayload, ReadingPayload};
use meterline_core::types::{ConnectionClass, DeviceInfo};
use meterline_store::{exceptions, maintenance, readings};
use sqlx::SqlitePool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::events::{EventBus, Subscription, SyncEvent, SyncEventKind};
use crate::probe::ConnectivityProbe;
use crate::sleeper::Sleeper;
use crate::state::StateManager;
use crate::types::{EndShiftOutcome, ManualSyncOutcome, SyncStatus, SyncSummary, SyncTrigger};

/// Who is syncing, stamped on every bulk payload.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub operator_id: String,
    pub device: DeviceInfo,
}

/// Orchestrates when and how pending local records reach the backend.
///
/// All collaborators are injected at construction, so isolated instances
/// can run against in-memory fakes. One instance owns the process-wide
/// re-entrancy guard: at most one sync executes at a time, whichever of
/// the five strategies asked for it.
pub struct SyncManager {
    inner: Arc<Inner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct Inner {
    pool: SqlitePool,
    transport: Arc<dyn BulkSyncTransport>,
    probe: Arc<dyn ConnectivityProbe>,
    sleeper: Arc<dyn Sleeper>,
    config: SyncConfig,
    context: SyncContext,
    state: StateManager,
    events: EventBus,
    syncing: AtomicBool,
    next_periodic_at: Mutex<Option<DateTime<Utc>>>,
    // Teardown signal for the scheduling loops. Never used to cancel a
    // sync in flight; the loops consult it only between awaits.
    shutdown: watch::Sender<bool>,
}

/// Clears the in-flight flag even if an attempt errors out early.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncManager {
    pub fn new(
        pool: SqlitePool,
        transport: Arc<dyn BulkSyncTransport>,
        probe: Arc<dyn ConnectivityProbe>,
        sleeper: Arc<dyn Sleeper>,
        config: SyncConfig,
        context: SyncContext,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: StateManager::new(pool.clone()),
                pool,
                transport,
                probe,
                sleeper,
                config,
                context,
                events: EventBus::new(),
                syncing: AtomicBool::new(false),
                next_periodic_at: Mutex::new(None),
                shutdown: watch::channel(false).0,
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Arm the periodic timer and the connectivity listener.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().expect("task registry poisoned");
        if !tasks.is_empty() {
            return;
        }

        info!(
            interval_secs = self.inner.config.periodic_interval.as_secs(),
            "Starting sync coordinator"
        );

        self.inner.shutdown.send_replace(false);
        tasks.push(tokio::spawn(Self::periodic_loop(Arc::clone(&self.inner))));
        tasks.push(tokio::spawn(Self::network_loop(Arc::clone(&self.inner))));
    }

    /// Tear down timers and listeners. An in-flight sync is allowed to
    /// finish (and still emits its terminal event) but produces no
    /// further scheduled triggers.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock().expect("task registry poisoned");
        if tasks.is_empty() {
            return;
        }

        // Dropping the handles detaches the loops; they exit at their
        // next shutdown check rather than being cancelled mid-sync.
        tasks.clear();
        self.inner.shutdown.send_replace(true);
        *self
            .inner
            .next_periodic_at
            .lock()
            .expect("schedule poisoned") = None;

        info!("Sync coordinator stopped");
    }

    /// Subscribe to sync status events.
    pub fn on(&self, listener: impl Fn(&SyncEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.events.on(listener)
    }

    /// Run one sync execution now under the given trigger.
    ///
    /// This is the single path every strategy funnels into; callers that
    /// need non-throwing outcomes wrap it (see [`Self::sync_now`]).
    pub async fn sync_all(&self, trigger: SyncTrigger) -> Result<SyncSummary> {
        self.inner.sync_all(trigger).await
    }

    /// Explicit user-invoked sync with distinct non-throwing outcomes.
    pub async fn sync_now(&self) -> Result<ManualSyncOutcome> {
        if !self.inner.config.sync_enabled {
            return Ok(ManualSyncOutcome::Disabled);
        }

        if self.inner.pending_total().await? == 0 {
            return Ok(ManualSyncOutcome::NothingPending);
        }

        match self.inner.sync_all(SyncTrigger::Manual).await {
            Ok(summary) => Ok(ManualSyncOutcome::Completed(summary)),
            Err(SyncError::AlreadySyncing) => Ok(ManualSyncOutcome::AlreadyRunning),
            Err(SyncError::Offline) => Ok(ManualSyncOutcome::Offline),
            Err(e) => Err(e),
        }
    }

    /// Batch-size strategy hook: call after each new reading is persisted.
    ///
    /// Triggers an immediate sync when the pending count reaches the
    /// configured threshold. Sync failures are reported through events and
    /// left for the other strategies to retry; only storage failures
    /// surface here.
    pub async fn notify_reading_saved(&self) -> Result<()> {
        if !self.inner.config.sync_enabled {
            return Ok(());
        }

        let pending = readings::count_pending(&self.inner.pool).await?;
        if pending < self.inner.config.batch_threshold {
            return Ok(());
        }

        debug!(pending, "Batch threshold reached");

        match self.inner.sync_all(SyncTrigger::BatchThreshold).await {
            Ok(_) | Err(SyncError::AlreadySyncing) | Err(SyncError::Offline) => Ok(()),
            Err(SyncError::Store(e)) => Err(SyncError::Store(e)),
            Err(e) => {
                warn!("Batch-triggered sync failed: {e}");
                Ok(())
            }
        }
    }

    /// Forced end-of-shift push with sequential exponential backoff.
    ///
    /// Never drops data: if every attempt fails, the returned outcome
    /// states how many records remain safe in the local store.
    pub async fn force_sync_end_of_shift(&self) -> Result<EndShiftOutcome> {
        let max_attempts = self.inner.config.max_retry_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.inner.sync_all(SyncTrigger::EndOfShift).await {
                Ok(summary) => return Ok(EndShiftOutcome::Completed(summary)),
                Err(e) => {
                    warn!(attempt, max_attempts, "End-of-shift sync attempt failed: {e}");
                    last_error = e.to_string();

                    if attempt < max_attempts {
                        let delay = self.inner.config.backoff_delay(attempt);
                        self.inner.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        let pending_readings = readings::count_pending(&self.inner.pool).await?;
        let pending_exceptions = exceptions::count_pending(&self.inner.pool).await?;

        error!(
            pending_readings,
            pending_exceptions, "End-of-shift sync exhausted all attempts; data kept locally"
        );

        Ok(EndShiftOutcome::Failed {
            attempts: max_attempts,
            pending_readings,
            pending_exceptions,
            last_error,
        })
    }

    /// Point-in-time view for status surfaces.
    pub async fn status(&self) -> Result<SyncStatus> {
        let stats = maintenance::storage_stats(&self.inner.pool).await?;
        let snapshot = self.inner.state.snapshot().await?;
        let is_syncing = self.inner.syncing.load(Ordering::SeqCst);
        let connection = self.inner.probe.current();

        Ok(SyncStatus {
            pending_readings: stats.pending_readings,
            pending_exceptions: stats.pending_exceptions,
            last_sync_at: snapshot.last_sync_at,
            is_syncing,
            next_periodic_at: *self
                .inner
                .next_periodic_at
                .lock()
                .expect("schedule poisoned"),
            connection,
            can_sync: self.inner.config.sync_enabled && connection.is_online() && !is_syncing,
        })
    }

    /// Sweep synced readings past the retention window.
    pub async fn run_retention(&self) -> Result<u64> {
        Ok(readings::cleanup_old_synced(&self.inner.pool).await?)
    }

    async fn periodic_loop(inner: Arc<Inner>) {
        let mut shutdown = inner.shutdown.subscribe();
        let mut ticker = tokio::time::interval(inner.config.periodic_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The first tick fires immediately; consume it so the first real
        // sync happens one full interval after start().
        ticker.tick().await;
        inner.schedule_next_periodic();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            inner.schedule_next_periodic();

            // The sync and the sweep run to completion even if stop()
            // arrives while they are in flight.
            match inner.pending_total().await {
                Ok(0) => {}
                Ok(pending) => {
                    debug!(pending, "Periodic sync trigger");
                    if let Err(e) = inner.sync_all(SyncTrigger::Periodic).await {
                        debug!("Periodic sync did not complete: {e}");
                    }
                }
                Err(e) => error!("Periodic pending-count check failed: {e}"),
            }

            if let Err(e) = readings::cleanup_old_synced(&inner.pool).await {
                error!("Retention sweep failed: {e}");
            }

            if *shutdown.borrow() {
                break;
            }
        }
    }

    async fn network_loop(inner: Arc<Inner>) {
        let mut shutdown = inner.shutdown.subscribe();
        let mut rx = inner.probe.subscribe();

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            let connection = *rx.borrow_and_update();

            inner
                .events
                .emit(&SyncEvent::now(SyncEventKind::NetworkChange { connection }));

            let opportunistic = connection == ConnectionClass::Wifi
                && inner.config.sync_on_wifi
                && inner.config.sync_enabled;
            if !opportunistic {
                continue;
            }

            match inner.pending_total().await {
                Ok(0) | Err(_) => {}
                Ok(pending) => {
                    debug!(pending, "Wifi detected, opportunistic sync trigger");
                    if let Err(e) = inner.sync_all(SyncTrigger::NetworkChange).await {
                        debug!("Opportunistic sync did not complete: {e}");
                    }
                }
            }

            if *shutdown.borrow() {
                break;
            }
        }
    }
}

impl Inner {
    async fn pending_total(&self) -> Result<u64> {
        let stats = maintenance::storage_stats(&self.pool).await?;
        Ok(stats.pending_readings + stats.pending_exceptions)
    }

    fn schedule_next_periodic(&self) {
        let interval = chrono::Duration::from_std(self.config.periodic_interval)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        *self.next_periodic_at.lock().expect("schedule poisoned") = Some(Utc::now() + interval);
    }

    async fn sync_all(&self, trigger: SyncTrigger) -> Result<SyncSummary> {
        // Re-entrancy guard, checked and set before any await point.
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadySyncing);
        }
        let _guard = SyncGuard(&self.syncing);

        if !self.probe.current().is_online() {
            return Err(SyncError::Offline);
        }

        self.events
            .emit(&SyncEvent::now(SyncEventKind::Started { trigger }));

        match self.execute(trigger).await {
            Ok(summary) => {
                if summary.failed_readings > 0 {
                    self.events.emit(&SyncEvent::now(SyncEventKind::Partial {
                        failed_readings: summary.failed_readings,
                    }));
                }
                self.events.emit(&SyncEvent::now(SyncEventKind::Completed {
                    readings_synced: summary.readings_synced,
                    exceptions_synced: summary.exceptions_synced,
                    failed_readings: summary.failed_readings,
                }));

                info!(
                    readings = summary.readings_synced,
                    exceptions = summary.exceptions_synced,
                    failed = summary.failed_readings,
                    trigger = ?trigger,
                    "Sync completed"
                );

                Ok(summary)
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(state_err) = self.state.record_error(&message).await {
                    error!("Failed to record sync error: {state_err}");
                }
                self.events
                    .emit(&SyncEvent::now(SyncEventKind::Failed { message }));

                Err(e)
            }
        }
    }

    async fn execute(&self, trigger: SyncTrigger) -> Result<SyncSummary> {
        // One logical snapshot of everything pending.
        let pending_readings = readings::get_pending(&self.pool).await?;
        let pending_exceptions = exceptions::get_pending(&self.pool).await?;

        if pending_readings.is_empty() && pending_exceptions.is_empty() {
            debug!("Nothing pending, skipping network call");
            return Ok(SyncSummary {
                trigger,
                readings_synced: 0,
                exceptions_synced: 0,
                failed_readings: 0,
                completed_at: Utc::now(),
            });
        }

        self.events.emit(&SyncEvent::now(SyncEventKind::Progress {
            readings: pending_readings.len(),
            exceptions: pending_exceptions.len(),
        }));

        let reading_ids: Vec<String> = pending_readings
            .iter()
            .map(|r| r.local_id.clone())
            .collect();
        let exception_ids: Vec<String> = pending_exceptions
            .iter()
            .map(|e| e.local_id.clone())
            .collect();

        let request = BulkSyncRequest {
            operator_id: self.context.operator_id.clone(),
            date: Utc::now().date_naive(),
            readings: pending_readings.iter().map(ReadingPayload::from).collect(),
            exceptions: pending_exceptions
                .iter()
                .map(ExceptionPayload::from)
                .collect(),
            device_info: self.context.device.clone(),
        };

        let response = match self.transport.push_bulk(&request).await {
            Ok(response) => response,
            Err(e) => {
                // Network-class failure: no local state flips, only the
                // attempt counters move.
                readings::increment_sync_attempts(&self.pool, &reading_ids).await?;
                return Err(e.into());
            }
        };

        if !response.success {
            readings::increment_sync_attempts(&self.pool, &reading_ids).await?;
            return Err(SyncError::BackendRejected(
                response
                    .message
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }

        let failed: HashSet<&str> = response
            .failed_readings
            .iter()
            .map(|f| f.local_id.as_str())
            .collect();

        let synced_ids: Vec<String> = reading_ids
            .iter()
            .filter(|id| !failed.contains(id.as_str()))
            .cloned()
            .collect();
        let failed_ids: Vec<String> = reading_ids
            .iter()
            .filter(|id| failed.contains(id.as_str()))
            .cloned()
            .collect();

        // Only acknowledged records flip; rejected ones stay pending for
        // a future attempt. Exceptions have no per-record failure channel
        // and commit with the overall success.
        readings::mark_synced(&self.pool, &synced_ids).await?;
        readings::increment_sync_attempts(&self.pool, &failed_ids).await?;
        exceptions::mark_synced(&self.pool, &exception_ids).await?;

        self.state
            .record_success(synced_ids.len(), exception_ids.len(), failed_ids.len())
            .await?;

        for failure in &response.failed_readings {
            warn!(
                local_id = %failure.local_id,
                reason = %failure.reason,
                "Backend rejected reading, kept pending"
            );
        }

        Ok(SyncSummary {
            trigger,
            readings_synced: synced_ids.len(),
            exceptions_synced: exception_ids.len(),
            failed_readings: failed_ids.len(),
            completed_at: Utc::now(),
        })
    }
}
