//! AutoSaver — debounced, batched persistence of dirty partitions.
//!
//! Every observation cancels the armed timer and, if anything is dirty, arms
//! a new one for the quiet interval. When a timer fires it disarms itself and
//! flushes: the payload is rebuilt from the partition source at that moment,
//! sent in one request, and acknowledged by revision so edits made while the
//! request was in flight stay dirty.
//!
//! At most one timer is armed and at most one flush runs at a time per
//! instance. Flushes never return `Err`; failures leave the partitions dirty
//! and are reported through [`SaveStatus`] and `on_error`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::store::{ListenerId, ProfileStore};
use crate::types::{PartitionKey, PartitionSnapshot, SavePayload};

use super::types::*;

// ============================================================================
// AutoSaver
// ============================================================================

/// Cheap to clone; clones share the same timer, status, and flush lock.
/// Dropping the last clone abandons an armed flush. A request already in
/// flight still completes.
#[derive(Clone)]
pub struct AutoSaver {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn ProfileTransport>,
    source: Arc<dyn PartitionSource>,
    quiet_interval: Mutex<Duration>,
    on_saved: Option<Arc<SavedCallback>>,
    on_error: Option<Arc<SaveErrorCallback>>,
    timer: Mutex<TimerSlot>,
    /// Serializes flushes so only one request is in flight.
    flush_lock: TokioMutex<()>,
    status: watch::Sender<SaveStatus>,
    disposed: AtomicBool,
    runtime: Handle,
}

/// The single scheduled-flush slot.
#[derive(Default)]
struct TimerSlot {
    /// Bumped on every arm/cancel; a woken timer only flushes if its
    /// generation is still current.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Create an auto-saver bound to the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new(options: AutoSaverOptions) -> Self {
        Self::with_runtime(options, Handle::current())
    }

    /// Create an auto-saver whose timers run on `runtime`. Lets observations
    /// come from threads outside the runtime.
    pub fn with_runtime(options: AutoSaverOptions, runtime: Handle) -> Self {
        let (status, _) = watch::channel(SaveStatus::default());
        Self {
            inner: Arc::new(Inner {
                transport: options.transport,
                source: options.source,
                quiet_interval: Mutex::new(
                    options.quiet_interval.unwrap_or(DEFAULT_QUIET_INTERVAL),
                ),
                on_saved: options.on_saved,
                on_error: options.on_error,
                timer: Mutex::new(TimerSlot::default()),
                flush_lock: TokioMutex::new(()),
                status,
                disposed: AtomicBool::new(false),
                runtime,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Re-evaluate the partition source: cancel the armed flush and, if any
    /// partition is dirty, arm a new one for the quiet interval.
    pub fn observe(&self) {
        let snapshot = self.inner.source.snapshot();
        self.observe_snapshot(&snapshot);
    }

    /// Same as [`observe`](Self::observe) for a caller-provided snapshot.
    ///
    /// The snapshot only decides whether to arm; the payload is always
    /// rebuilt from the partition source when the timer fires.
    pub fn observe_snapshot(&self, snapshot: &[PartitionSnapshot]) {
        if self.is_disposed() {
            return;
        }

        let dirty: Vec<PartitionKey> = snapshot
            .iter()
            .filter(|p| p.is_edited)
            .map(|p| p.key)
            .collect();

        let mut slot = self.inner.timer.lock();
        Inner::cancel_locked(&mut slot);

        if dirty.is_empty() {
            return;
        }

        let generation = slot.generation;
        let delay = *self.inner.quiet_interval.lock();
        // The armed timer must not keep a dropped saver alive.
        let weak = Arc::downgrade(&self.inner);
        slot.pending = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.claim_timer(generation) {
                inner.flush().await;
            }
        }));
        debug!(partitions = ?dirty, delay_ms = delay.as_millis() as u64, "auto-save armed");
    }

    /// Subscribe to `store` so every edit or hydration triggers
    /// [`observe`](Self::observe). Dropping the returned [`Subscription`]
    /// detaches it again.
    pub fn attach(&self, store: &Arc<ProfileStore>) -> Subscription {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let id = store.subscribe(move |event| {
            if !event.affects_dirty_set() {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                AutoSaver { inner }.observe();
            }
        });
        Subscription {
            store: Arc::downgrade(store),
            id: Some(id),
        }
    }

    // -----------------------------------------------------------------------
    // Flush control
    // -----------------------------------------------------------------------

    /// Cancel the armed timer and flush immediately. Waits for any in-flight
    /// flush to finish first.
    pub async fn flush_now(&self) -> SaveOutcome {
        self.cancel();
        self.inner.flush().await
    }

    /// Cancel the armed timer without flushing.
    pub fn cancel(&self) {
        let mut slot = self.inner.timer.lock();
        Inner::cancel_locked(&mut slot);
    }

    /// Cancel the armed timer and ignore all further observations. A request
    /// already in flight is left to complete.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.cancel();
        debug!("auto-saver disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether a flush timer is armed.
    pub fn is_pending(&self) -> bool {
        self.inner.timer.lock().pending.is_some()
    }

    // -----------------------------------------------------------------------
    // Settings & status
    // -----------------------------------------------------------------------

    pub fn quiet_interval(&self) -> Duration {
        *self.inner.quiet_interval.lock()
    }

    /// Applies to timers armed after the call.
    pub fn set_quiet_interval(&self, interval: Duration) {
        *self.inner.quiet_interval.lock() = interval;
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver that wakes whenever [`status`](Self::status) changes.
    pub fn status_changes(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }
}

impl Inner {
    fn cancel_locked(slot: &mut TimerSlot) {
        slot.generation += 1;
        if let Some(handle) = slot.pending.take() {
            handle.abort();
            trace!("armed auto-save cancelled");
        }
    }

    /// Called by a woken timer. Disarms the slot if the timer is still the
    /// current one so later observations cannot abort the flush it starts.
    fn claim_timer(&self, generation: u64) -> bool {
        let mut slot = self.timer.lock();
        if slot.generation != generation {
            return false;
        }
        slot.pending = None;
        true
    }

    async fn flush(&self) -> SaveOutcome {
        let _guard = self.flush_lock.lock().await;

        // Rebuilt at fire time so the payload includes every edit up to now.
        let payload = SavePayload::from_snapshot(&self.source.snapshot());
        if payload.is_empty() {
            debug!("nothing dirty at flush time");
            return SaveOutcome::Skipped;
        }

        let keys = payload.keys();
        info!(partitions = ?keys, "auto-saving profile");
        self.status.send_modify(|s| {
            s.in_flight = true;
            s.requests_sent += 1;
        });

        match self.transport.update_profile(&payload).await {
            Ok(()) => {
                let cleared = self.source.mark_saved(&payload.acks());
                info!(partitions = ?keys, cleared = cleared.len(), "profile saved");
                self.status.send_modify(|s| {
                    s.in_flight = false;
                    s.last = LastSave::Saved {
                        at: Utc::now(),
                        keys: keys.clone(),
                    };
                });
                if let Some(cb) = &self.on_saved {
                    cb(&keys);
                }
                SaveOutcome::Saved { keys }
            }
            Err(error) => {
                warn!(
                    partitions = ?keys,
                    error = %error,
                    "auto-save failed, partitions stay dirty"
                );
                self.status.send_modify(|s| {
                    s.in_flight = false;
                    s.last = LastSave::Failed {
                        at: Utc::now(),
                        keys: keys.clone(),
                        error: error.to_string(),
                    };
                });
                if let Some(cb) = &self.on_error {
                    cb(&SaveErrorEvent {
                        keys: keys.clone(),
                        error: error.clone(),
                    });
                }
                SaveOutcome::Failed { keys, error }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().pending.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Keeps an [`AutoSaver`] attached to a [`ProfileStore`]; detaches on drop.
pub struct Subscription {
    store: Weak<ProfileStore>,
    id: Option<ListenerId>,
}

impl Subscription {
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(store)) = (self.id.take(), self.store.upgrade()) {
            store.unsubscribe(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
