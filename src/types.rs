use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ProfileError;

/// Field-name → value mapping held by a partition.
pub type PartitionData = Map<String, Value>;

/// Identifies one of the four independently tracked profile regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartitionKey {
    PersonalInfo,
    MedicalProfile,
    AccountSettings,
    SecuritySettings,
}

impl PartitionKey {
    /// All partitions, in payload order.
    pub const ALL: [PartitionKey; 4] = [
        PartitionKey::PersonalInfo,
        PartitionKey::MedicalProfile,
        PartitionKey::AccountSettings,
        PartitionKey::SecuritySettings,
    ];

    /// Stable wire key used in the update payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "personalInfo",
            Self::MedicalProfile => "medicalProfile",
            Self::AccountSettings => "accountSettings",
            Self::SecuritySettings => "securitySettings",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "Personal Info",
            Self::MedicalProfile => "Medical Profile",
            Self::AccountSettings => "Account Settings",
            Self::SecuritySettings => "Security Settings",
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKey {
    type Err = ProfileError;

    /// Accepts the wire key (`medicalProfile`) or its kebab form (`medical-profile`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '-' && *c != '_').collect();
        PartitionKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ProfileError::UnknownPartition(s.to_string()))
    }
}

/// A partition as held by the store.
///
/// `revision` increases on every local mutation and is never reset; a save
/// acknowledgement only clears `is_edited` when the revision it carries is
/// still current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub data: PartitionData,
    pub is_edited: bool,
    #[serde(skip)]
    pub revision: u64,
}

/// Point-in-time copy of one partition, handed to the auto-saver.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSnapshot {
    pub key: PartitionKey,
    pub data: PartitionData,
    pub is_edited: bool,
    pub revision: u64,
}

impl PartitionSnapshot {
    pub fn new(key: PartitionKey, partition: &Partition) -> Self {
        Self {
            key,
            data: partition.data.clone(),
            is_edited: partition.is_edited,
            revision: partition.revision,
        }
    }
}

/// Confirms that `key` was persisted at `revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveAck {
    pub key: PartitionKey,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct PayloadEntry {
    key: PartitionKey,
    data: PartitionData,
    revision: u64,
}

/// Body of one batched update request: every dirty partition's data, keyed
/// by its wire key, in the order the partitions were observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePayload {
    entries: Vec<PayloadEntry>,
}

impl SavePayload {
    /// Collect the dirty partitions of `snapshot`. Clean partitions never
    /// appear in the payload.
    pub fn from_snapshot(snapshot: &[PartitionSnapshot]) -> Self {
        let entries = snapshot
            .iter()
            .filter(|p| p.is_edited)
            .map(|p| PayloadEntry {
                key: p.key,
                data: p.data.clone(),
                revision: p.revision,
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> Vec<PartitionKey> {
        self.entries.iter().map(|e| e.key).collect()
    }

    /// Acknowledgements to apply once the server confirmed this payload.
    pub fn acks(&self) -> Vec<SaveAck> {
        self.entries
            .iter()
            .map(|e| SaveAck {
                key: e.key,
                revision: e.revision,
            })
            .collect()
    }

    /// The request body as a JSON object.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|e| (e.key.as_str().to_string(), Value::Object(e.data.clone())))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for SavePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(entry.key.as_str(), &entry.data)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
