//! StoreEvent — what changed in the profile store.

use crate::types::PartitionKey;

/// Handle returned by `ProfileStore::subscribe`.
pub type ListenerId = u64;

/// Callback invoked synchronously after each store change.
pub type StoreListener = dyn Fn(&StoreEvent) + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// All partitions were replaced from a server document and are clean.
    Hydrated,
    /// A local edit changed one partition and marked it dirty.
    Edited { key: PartitionKey },
    /// A save acknowledgement cleared these partitions' dirty flags.
    Saved { keys: Vec<PartitionKey> },
}

impl StoreEvent {
    /// Whether the event can change the set of dirty partitions in a way
    /// the auto-saver has to react to.
    pub fn affects_dirty_set(&self) -> bool {
        !matches!(self, Self::Saved { .. })
    }
}
