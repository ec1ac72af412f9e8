//! Auto-save types: the transport and partition-source seams, outcomes,
//! status, and options.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TransportError;
use crate::types::{PartitionKey, PartitionSnapshot, SaveAck, SavePayload};

/// Debounce applied when no quiet interval is configured.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(2500);

// ============================================================================
// ProfileTransport — network seam
// ============================================================================

/// Sends one batched partial update of the profile.
///
/// Implementations attach credentials themselves (cookies, headers). Only
/// success or failure matters; a response body is not consumed.
#[async_trait]
pub trait ProfileTransport: Send + Sync {
    async fn update_profile(&self, payload: &SavePayload) -> Result<(), TransportError>;
}

// ============================================================================
// PartitionSource — state seam
// ============================================================================

/// Read access to the partitions plus the single mutation the auto-saver is
/// allowed to make: clearing dirty flags after a confirmed save.
pub trait PartitionSource: Send + Sync {
    /// Every partition, in payload order.
    fn snapshot(&self) -> Vec<PartitionSnapshot>;

    /// Clear the dirty flag for each ack whose revision is still current.
    /// Returns the partitions that were cleared.
    fn mark_saved(&self, acks: &[SaveAck]) -> Vec<PartitionKey>;
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of one flush. Flushes never return `Err`; failures are reported
/// here and through `on_error`.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing was dirty; no request was sent.
    Skipped,
    /// The server accepted the payload.
    Saved { keys: Vec<PartitionKey> },
    /// The request failed; the partitions stay dirty.
    Failed {
        keys: Vec<PartitionKey>,
        error: TransportError,
    },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Passed to the `on_error` callback when a flush fails.
#[derive(Debug, Clone)]
pub struct SaveErrorEvent {
    pub keys: Vec<PartitionKey>,
    pub error: TransportError,
}

/// Most recent completed flush, for an "unsaved changes" indicator.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LastSave {
    #[default]
    Idle,
    Saved {
        at: DateTime<Utc>,
        keys: Vec<PartitionKey>,
    },
    Failed {
        at: DateTime<Utc>,
        keys: Vec<PartitionKey>,
        error: String,
    },
}

/// Observable auto-saver state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveStatus {
    pub last: LastSave,
    /// Update requests issued so far (successful or not).
    pub requests_sent: u64,
    pub in_flight: bool,
}

impl SaveStatus {
    pub fn last_error(&self) -> Option<&str> {
        match &self.last {
            LastSave::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

// ============================================================================
// AutoSaver Options
// ============================================================================

/// Callback type for successful saves.
pub type SavedCallback = dyn Fn(&[PartitionKey]) + Send + Sync;

/// Callback type for failed saves.
pub type SaveErrorCallback = dyn Fn(&SaveErrorEvent) + Send + Sync;

/// Configuration for `AutoSaver`.
pub struct AutoSaverOptions {
    pub transport: Arc<dyn ProfileTransport>,
    pub source: Arc<dyn PartitionSource>,
    /// Debounce duration (`None` = 2500 ms)
    pub quiet_interval: Option<Duration>,
    /// Called after each successful save with the partitions that were sent
    pub on_saved: Option<Arc<SavedCallback>>,
    /// Called after each failed save
    pub on_error: Option<Arc<SaveErrorCallback>>,
}

impl AutoSaverOptions {
    pub fn new(transport: Arc<dyn ProfileTransport>, source: Arc<dyn PartitionSource>) -> Self {
        Self {
            transport,
            source,
            quiet_interval: None,
            on_saved: None,
            on_error: None,
        }
    }

    pub fn quiet_interval(mut self, interval: Duration) -> Self {
        self.quiet_interval = Some(interval);
        self
    }

    pub fn on_saved(mut self, callback: impl Fn(&[PartitionKey]) + Send + Sync + 'static) -> Self {
        self.on_saved = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&SaveErrorEvent) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}
