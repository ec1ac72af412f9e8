use serde_json::{json, Value};

use meditrack::error::ProfileError;
use meditrack::profile::{completion, SectionStatus};
use meditrack::store::split_account;

fn full_account() -> Value {
    json!({
        "_id": "64f0c0ffee",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "role": "patient",
        "emailId": "ada@example.com",
        "phone": "555-0100",
        "biography": "Mathematician",
        "bloodType": "O+",
        "dateOfBirth": "1815-12-10",
        "gender": "female",
        "avatar": null,
        "password": "hashed",
        "address": {
            "street": "1 Analytical Way",
            "city": "London",
            "state": "Greater London",
            "zipCode": "W1",
            "country": "UK",
            "extra": "dropped"
        },
        "emergencyContact": {"name": "Charles", "relationship": "friend", "phone": "555-0199"},
        "medicalProfile": {"allergies": ["penicillin"], "conditions": []},
        "accountSettings": {"theme": "dark", "language": "en"},
        "securitySettings": {"twoFactor": true}
    })
}

#[test]
fn personal_info_is_built_from_top_level_fields() {
    let hydrated = split_account(&full_account()).unwrap();
    let personal = &hydrated.personal_info;

    assert_eq!(personal["firstName"], json!("Ada"));
    assert_eq!(personal["primaryPhone"], json!("555-0100"));
    assert!(!personal.contains_key("phone"));
    assert!(!personal.contains_key("password"));
    assert!(!personal.contains_key("_id"));
    assert_eq!(personal["emergencyContact"]["phone"], json!("555-0199"));
    assert_eq!(personal["address"]["zipCode"], json!("W1"));
    assert!(personal["address"].get("extra").is_none());
}

#[test]
fn missing_scalar_fields_become_null() {
    let hydrated = split_account(&json!({
        "firstName": "Ada",
        "address": {"city": "London"},
        "emergencyContact": {}
    }))
    .unwrap();

    assert_eq!(hydrated.personal_info["lastName"], Value::Null);
    assert_eq!(hydrated.personal_info["address"]["street"], Value::Null);
    assert_eq!(hydrated.personal_info["emergencyContact"]["name"], Value::Null);
}

#[test]
fn nested_sections_are_copied_verbatim() {
    let hydrated = split_account(&full_account()).unwrap();

    assert_eq!(
        Value::Object(hydrated.medical_profile),
        json!({"allergies": ["penicillin"], "conditions": []})
    );
    assert_eq!(
        Value::Object(hydrated.account_settings),
        json!({"theme": "dark", "language": "en"})
    );
    assert_eq!(
        Value::Object(hydrated.security_settings),
        json!({"twoFactor": true})
    );
}

#[test]
fn absent_optional_sections_are_empty() {
    let hydrated = split_account(&json!({
        "address": {},
        "emergencyContact": {},
        "medicalProfile": null
    }))
    .unwrap();

    assert!(hydrated.medical_profile.is_empty());
    assert!(hydrated.account_settings.is_empty());
    assert!(hydrated.security_settings.is_empty());
}

#[test]
fn missing_emergency_contact_is_rejected() {
    let err = split_account(&json!({"address": {}})).unwrap_err();
    assert!(matches!(err, ProfileError::MissingSection("emergencyContact")));
}

#[test]
fn non_object_section_is_rejected() {
    let err = split_account(&json!({
        "address": {},
        "emergencyContact": {},
        "securitySettings": "on"
    }))
    .unwrap_err();

    match err {
        ProfileError::InvalidSection { section, found } => {
            assert_eq!(section, "securitySettings");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_object_account_is_rejected() {
    assert!(matches!(
        split_account(&json!([1, 2])),
        Err(ProfileError::NotAnObject(_))
    ));
}

#[test]
fn hydrated_personal_info_feeds_completion() {
    let hydrated = split_account(&full_account()).unwrap();
    let report = completion(&hydrated.personal_info);

    assert_eq!(report.percentage, 75);
    for section in &report.sections[..3] {
        assert_eq!(section.status, SectionStatus::Complete);
    }
    assert_eq!(report.sections[3].status, SectionStatus::Incomplete);
}
