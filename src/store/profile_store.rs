//! ProfileStore — the in-memory home of the four profile partitions.
//!
//! Every mutation writes the data, the dirty flag, and the revision under one
//! lock, then emits a [`StoreEvent`] after the lock is released. Listeners may
//! therefore read or edit the store from inside their callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ProfileError;
use crate::sync::types::PartitionSource;
use crate::types::{Partition, PartitionData, PartitionKey, PartitionSnapshot, SaveAck};

use super::event::{ListenerId, StoreEvent, StoreListener};
use super::hydrate::split_account;

/// All four partitions. Serializes as
/// `{"personalInfo": {"data": …, "isEdited": …}, …}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileState {
    pub personal_info: Partition,
    pub medical_profile: Partition,
    pub account_settings: Partition,
    pub security_settings: Partition,
}

impl ProfileState {
    pub fn get(&self, key: PartitionKey) -> &Partition {
        match key {
            PartitionKey::PersonalInfo => &self.personal_info,
            PartitionKey::MedicalProfile => &self.medical_profile,
            PartitionKey::AccountSettings => &self.account_settings,
            PartitionKey::SecuritySettings => &self.security_settings,
        }
    }

    pub fn get_mut(&mut self, key: PartitionKey) -> &mut Partition {
        match key {
            PartitionKey::PersonalInfo => &mut self.personal_info,
            PartitionKey::MedicalProfile => &mut self.medical_profile,
            PartitionKey::AccountSettings => &mut self.account_settings,
            PartitionKey::SecuritySettings => &mut self.security_settings,
        }
    }

    pub fn dirty_keys(&self) -> Vec<PartitionKey> {
        PartitionKey::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_edited)
            .collect()
    }
}

pub struct ProfileStore {
    state: Mutex<ProfileState>,
    listeners: Mutex<Vec<(ListenerId, Arc<StoreListener>)>>,
    next_listener: AtomicU64,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProfileState::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Replace every partition from the server's account document. All
    /// partitions end up clean; pending local edits are discarded.
    pub fn initialize(&self, account: &Value) -> Result<(), ProfileError> {
        let hydrated = split_account(account)?;
        {
            let mut state = self.state.lock();
            for (key, data) in [
                (PartitionKey::PersonalInfo, hydrated.personal_info),
                (PartitionKey::MedicalProfile, hydrated.medical_profile),
                (PartitionKey::AccountSettings, hydrated.account_settings),
                (PartitionKey::SecuritySettings, hydrated.security_settings),
            ] {
                let partition = state.get_mut(key);
                partition.data = data;
                partition.is_edited = false;
                partition.revision += 1;
            }
        }
        debug!("profile store hydrated");
        self.emit(StoreEvent::Hydrated);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Local edits
    // -----------------------------------------------------------------------

    /// Replace a partition's data and mark it dirty.
    pub fn update(&self, key: PartitionKey, data: PartitionData) {
        self.edit(key, |partition| partition.data = data);
    }

    /// Shallow-merge `patch` into a partition's data and mark it dirty.
    pub fn merge(&self, key: PartitionKey, patch: PartitionData) {
        self.edit(key, |partition| partition.data.extend(patch));
    }

    pub fn update_personal(&self, data: PartitionData) {
        self.update(PartitionKey::PersonalInfo, data);
    }

    /// Medical edits arrive as partial forms, so they merge rather than replace.
    pub fn update_medical(&self, patch: PartitionData) {
        self.merge(PartitionKey::MedicalProfile, patch);
    }

    pub fn update_account(&self, data: PartitionData) {
        self.update(PartitionKey::AccountSettings, data);
    }

    pub fn update_security(&self, data: PartitionData) {
        self.update(PartitionKey::SecuritySettings, data);
    }

    /// [`update`](Self::update) for an untyped JSON value, which must be an object.
    pub fn update_value(&self, key: PartitionKey, value: Value) -> Result<(), ProfileError> {
        let data = into_object(key, value)?;
        self.update(key, data);
        Ok(())
    }

    /// [`merge`](Self::merge) for an untyped JSON value, which must be an object.
    pub fn merge_value(&self, key: PartitionKey, value: Value) -> Result<(), ProfileError> {
        let patch = into_object(key, value)?;
        self.merge(key, patch);
        Ok(())
    }

    fn edit(&self, key: PartitionKey, apply: impl FnOnce(&mut Partition)) {
        let revision = {
            let mut state = self.state.lock();
            let partition = state.get_mut(key);
            apply(partition);
            partition.is_edited = true;
            partition.revision += 1;
            partition.revision
        };
        debug!(partition = %key, revision, "partition edited");
        self.emit(StoreEvent::Edited { key });
    }

    // -----------------------------------------------------------------------
    // Save acknowledgement
    // -----------------------------------------------------------------------

    /// Clear the dirty flag of each acknowledged partition whose revision is
    /// still the one that was sent. Returns the partitions actually cleared.
    pub fn mark_saved(&self, acks: &[SaveAck]) -> Vec<PartitionKey> {
        let cleared: Vec<PartitionKey> = {
            let mut state = self.state.lock();
            acks.iter()
                .filter_map(|ack| {
                    let partition = state.get_mut(ack.key);
                    if partition.revision == ack.revision && partition.is_edited {
                        partition.is_edited = false;
                        Some(ack.key)
                    } else {
                        None
                    }
                })
                .collect()
        };

        let stale = acks.len() - cleared.len();
        if stale > 0 {
            debug!(stale, "edited during save, left dirty");
        }
        if !cleared.is_empty() {
            self.emit(StoreEvent::Saved {
                keys: cleared.clone(),
            });
        }
        cleared
    }

    /// Clear every dirty flag regardless of revision.
    pub fn mark_all_saved(&self) {
        let cleared = {
            let mut state = self.state.lock();
            let dirty = state.dirty_keys();
            for key in &dirty {
                state.get_mut(*key).is_edited = false;
            }
            dirty
        };
        if !cleared.is_empty() {
            self.emit(StoreEvent::Saved { keys: cleared });
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn state(&self) -> ProfileState {
        self.state.lock().clone()
    }

    pub fn partition(&self, key: PartitionKey) -> Partition {
        self.state.lock().get(key).clone()
    }

    pub fn data(&self, key: PartitionKey) -> PartitionData {
        self.state.lock().get(key).data.clone()
    }

    pub fn is_dirty(&self, key: PartitionKey) -> bool {
        self.state.lock().get(key).is_edited
    }

    pub fn dirty_keys(&self) -> Vec<PartitionKey> {
        self.state.lock().dirty_keys()
    }

    pub fn snapshot(&self) -> Vec<PartitionSnapshot> {
        let state = self.state.lock();
        PartitionKey::ALL
            .into_iter()
            .map(|key| PartitionSnapshot::new(key, state.get(key)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register a callback fired synchronously after every change.
    pub fn subscribe(
        &self,
        callback: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        id
    }

    /// Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().retain(|(listener, _)| *listener != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver `event` to the listeners registered when the call starts.
    /// A listener subscribed from inside a callback first hears the next event.
    fn emit(&self, event: StoreEvent) {
        let targets: Vec<Arc<StoreListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(?event, listeners = targets.len(), "store event");
        for listener in targets {
            listener(&event);
        }
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionSource for ProfileStore {
    fn snapshot(&self) -> Vec<PartitionSnapshot> {
        ProfileStore::snapshot(self)
    }

    fn mark_saved(&self, acks: &[SaveAck]) -> Vec<PartitionKey> {
        ProfileStore::mark_saved(self, acks)
    }
}

fn into_object(key: PartitionKey, value: Value) -> Result<PartitionData, ProfileError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ProfileError::NotAnObject(key.as_str().to_string())),
    }
}
