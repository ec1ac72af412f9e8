//! Maps the backend's account document onto the four profile partitions.
//!
//! The account document is what `/login` and `/me` return under `data`:
//! a flat user record with nested `address`, `emergencyContact`,
//! `medicalProfile`, `accountSettings` and `securitySettings` objects.

use serde_json::{Map, Value};

use crate::error::ProfileError;
use crate::types::PartitionData;

/// Scalar fields copied into personal info. `phone` is renamed to
/// `primaryPhone` to keep it apart from the emergency contact's phone.
const PERSONAL_FIELDS: &[(&str, &str)] = &[
    ("firstName", "firstName"),
    ("lastName", "lastName"),
    ("role", "role"),
    ("specialization", "specialization"),
    ("emailId", "emailId"),
    ("phone", "primaryPhone"),
    ("biography", "biography"),
    ("bloodType", "bloodType"),
    ("dateOfBirth", "dateOfBirth"),
    ("gender", "gender"),
    ("avatar", "avatar"),
];

const ADDRESS_FIELDS: &[&str] = &["street", "city", "state", "zipCode", "country"];

const EMERGENCY_FIELDS: &[&str] = &["name", "relationship", "phone"];

/// Partition data produced by hydration, one field per partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydratedProfile {
    pub personal_info: PartitionData,
    pub medical_profile: PartitionData,
    pub account_settings: PartitionData,
    pub security_settings: PartitionData,
}

pub fn split_account(account: &Value) -> Result<HydratedProfile, ProfileError> {
    let raw = account
        .as_object()
        .ok_or_else(|| ProfileError::NotAnObject("account".to_string()))?;

    let mut personal_info = pick(raw, PERSONAL_FIELDS);
    personal_info.insert(
        "address".to_string(),
        Value::Object(nested(raw, "address", ADDRESS_FIELDS)?),
    );
    personal_info.insert(
        "emergencyContact".to_string(),
        Value::Object(nested(raw, "emergencyContact", EMERGENCY_FIELDS)?),
    );

    Ok(HydratedProfile {
        personal_info,
        medical_profile: section(raw, "medicalProfile")?,
        account_settings: section(raw, "accountSettings")?,
        security_settings: section(raw, "securitySettings")?,
    })
}

fn pick(raw: &Map<String, Value>, fields: &[(&str, &str)]) -> PartitionData {
    fields
        .iter()
        .map(|(from, to)| {
            let value = raw.get(*from).cloned().unwrap_or(Value::Null);
            (to.to_string(), value)
        })
        .collect()
}

/// Required nested object; absent or null is an error, absent sub-fields are null.
fn nested(
    raw: &Map<String, Value>,
    name: &'static str,
    fields: &[&str],
) -> Result<PartitionData, ProfileError> {
    match raw.get(name) {
        None | Some(Value::Null) => Err(ProfileError::MissingSection(name)),
        Some(Value::Object(obj)) => Ok(fields
            .iter()
            .map(|f| (f.to_string(), obj.get(*f).cloned().unwrap_or(Value::Null)))
            .collect()),
        Some(other) => Err(ProfileError::InvalidSection {
            section: name,
            found: kind_of(other).to_string(),
        }),
    }
}

/// Optional section copied verbatim; absent or null becomes empty.
fn section(raw: &Map<String, Value>, name: &'static str) -> Result<PartitionData, ProfileError> {
    match raw.get(name) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(obj)) => Ok(obj.clone()),
        Some(other) => Err(ProfileError::InvalidSection {
            section: name,
            found: kind_of(other).to_string(),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
