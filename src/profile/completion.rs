//! Profile completeness, derived from the personal-info partition.
//!
//! Three scored sections (personal, contact, medical) contribute 25 points
//! when every field is filled and 12.5 when some are. Insurance is listed but
//! never scored.

use serde::Serialize;
use serde_json::Value;

use crate::types::PartitionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Personal,
    Contact,
    Medical,
    Insurance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Complete,
    Partial,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionCompletion {
    pub section: Section,
    pub status: SectionStatus,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    /// 0–100, rounded half up.
    pub percentage: u8,
    pub sections: Vec<SectionCompletion>,
}

impl CompletionReport {
    pub fn section(&self, section: Section) -> Option<&SectionCompletion> {
        self.sections.iter().find(|s| s.section == section)
    }
}

struct SectionRule {
    section: Section,
    complete: &'static str,
    partial: &'static str,
    incomplete: &'static str,
}

const PERSONAL: SectionRule = SectionRule {
    section: Section::Personal,
    complete: "Basic profile details completed",
    partial: "Some details missing",
    incomplete: "Not added yet",
};

const CONTACT: SectionRule = SectionRule {
    section: Section::Contact,
    complete: "Email and phone verified",
    partial: "Some contact info missing",
    incomplete: "Not added yet",
};

const MEDICAL: SectionRule = SectionRule {
    section: Section::Medical,
    complete: "All medical history provided",
    partial: "Some information missing",
    incomplete: "Some information missing",
};

pub fn completion(personal_info: &PartitionData) -> CompletionReport {
    let get = |path: &[&str]| lookup(personal_info, path);

    let full_name = full_name(personal_info);
    let personal = [
        full_name.as_deref().map(filled_str).unwrap_or(false),
        is_filled(get(&["dateOfBirth"])),
        is_filled(get(&["gender"])),
    ];
    let contact = [
        is_filled(get(&["emailId"])),
        is_filled(get(&["primaryPhone"])),
        is_filled(get(&["address", "street"])),
        is_filled(get(&["emergencyContact", "phone"])),
    ];
    let medical = [is_filled(get(&["bloodType"])), is_filled(get(&["biography"]))];

    let mut total = 0.0_f64;
    let mut sections = Vec::with_capacity(4);
    for (rule, fields) in [
        (&PERSONAL, &personal[..]),
        (&CONTACT, &contact[..]),
        (&MEDICAL, &medical[..]),
    ] {
        let (entry, points) = score(rule, fields);
        total += points;
        sections.push(entry);
    }
    sections.push(SectionCompletion {
        section: Section::Insurance,
        status: SectionStatus::Incomplete,
        text: "Not added yet",
    });

    CompletionReport {
        percentage: total.round() as u8,
        sections,
    }
}

fn score(rule: &SectionRule, fields: &[bool]) -> (SectionCompletion, f64) {
    let filled = fields.iter().filter(|f| **f).count();
    let (status, text, points) = if filled == fields.len() {
        (SectionStatus::Complete, rule.complete, 25.0)
    } else if filled > 0 {
        (SectionStatus::Partial, rule.partial, 12.5)
    } else {
        (SectionStatus::Incomplete, rule.incomplete, 0.0)
    };
    (
        SectionCompletion {
            section: rule.section,
            status,
            text,
        },
        points,
    )
}

fn full_name(personal_info: &PartitionData) -> Option<String> {
    let part = |key: &str| {
        personal_info
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let name = format!("{} {}", part("firstName"), part("lastName"));
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn lookup<'a>(data: &'a PartitionData, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(data.get(*first)?, |value, key| value.get(*key))
}

fn filled_str(s: &str) -> bool {
    !s.is_empty()
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => filled_str(s),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
