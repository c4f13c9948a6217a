use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use intake_cell::models::{
    Gender, IntakeValidationRules, NormalizedRecord, RawFields, SubmissionKind, MAX_SCHEDULE_GRACE_MINUTES,
};
use intake_cell::services::IntakeValidator;

fn raw(value: Value) -> RawFields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

fn registration_payload() -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "  Ada@Example.COM ",
        "phone": "+15551234567",
        "birthDate": "1990-04-12",
        "gender": "Female",
        "address": "12 Analytical Way",
        "occupation": "Mathematician",
        "emergencyContactName": "Charles Babbage",
        "emergencyContactNumber": "+15557654321",
        "primaryPhysician": "Dr. Lee",
        "insuranceProvider": "Acme Health",
        "insurancePolicyNumber": "AC-123456",
        "allergies": "Penicillin",
        "identificationType": "Passport",
        "identificationNumber": "X1234567",
        "treatmentConsent": true,
        "disclosureConsent": true,
        "privacyConsent": true
    })
}

fn create_payload() -> Value {
    json!({
        "userId": "user-1",
        "patient": "patient-1",
        "primaryPhysician": "Dr. Lee",
        "schedule": "2026-10-17T10:00:00Z",
        "reason": "checkup"
    })
}

#[test]
fn valid_registration_is_normalized() {
    let validator = IntakeValidator::with_default_rules();

    let record = validator
        .submit_at(SubmissionKind::PatientRegistration, &raw(registration_payload()), now())
        .unwrap();

    let registration = assert_matches!(record, NormalizedRecord::PatientRegistration(r) => r);
    assert_eq!(registration.email, "ada@example.com");
    assert_eq!(registration.name, "Ada Lovelace");
    assert_eq!(registration.gender, Gender::Female);
    assert_eq!(registration.birth_date, NaiveDate::from_ymd_opt(1990, 4, 12).unwrap());
    assert_eq!(registration.allergies.as_deref(), Some("Penicillin"));
    assert_eq!(registration.current_medication, None);
    assert!(registration.treatment_consent && registration.disclosure_consent && registration.privacy_consent);
}

#[test]
fn registration_collects_every_failing_field() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["name"] = json!("A");
    payload["email"] = json!("not-an-email");
    payload["phone"] = json!("555-1234");
    payload["birthDate"] = json!("2030-01-01");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    assert_eq!(errors.len(), 4);
    assert!(errors.has_field("name"));
    assert_eq!(errors.messages_for("email"), vec!["invalid email address"]);
    assert!(errors.has_field("phone"));
    assert_eq!(errors.messages_for("birthDate"), vec!["birth date cannot be in the future"]);
}

#[test]
fn registration_requires_literal_true_consents() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["treatmentConsent"] = json!("true");
    payload["disclosureConsent"] = json!(false);
    payload.as_object_mut().unwrap().remove("privacyConsent");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    for field in ["treatmentConsent", "disclosureConsent", "privacyConsent"] {
        assert_eq!(errors.messages_for(field), vec!["consent required"]);
    }
}

#[test]
fn identification_type_requires_number() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["identificationNumber"] = json!("   ");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(errors.has_field("identificationNumber"));
}

#[test]
fn phone_numbers_must_be_text() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["phone"] = json!(15551234567u64);
    payload["emergencyContactNumber"] = json!("0015551234567");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    assert_eq!(errors.messages_for("phone"), vec!["phone number must be provided as text"]);
    assert!(!errors.has_field("emergencyContactNumber"));
}

#[test]
fn phone_numbers_only_accept_ascii_digits() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["phone"] = json!("\u{0661}\u{0662}\u{0663}\u{0664}\u{0665}\u{0666}\u{0667}\u{0668}\u{0669}\u{0660}\u{0661}");
    payload["emergencyContactNumber"] = json!("+\u{FF11}\u{FF15}\u{FF15}\u{FF15}\u{FF11}\u{FF12}\u{FF13}\u{FF14}\u{FF15}\u{FF16}\u{FF17}");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    assert_eq!(
        errors.messages_for("phone"),
        vec!["phone number must contain 10 to 15 digits with an optional leading +"]
    );
    assert!(errors.has_field("emergencyContactNumber"));
}

#[test]
fn name_length_counts_visible_characters() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["name"] = json!(" A");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    assert_eq!(errors.messages_for("name"), vec!["name must be at least 2 characters"]);
}

#[test]
fn unknown_gender_is_rejected() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = registration_payload();
    payload["gender"] = json!("robot");

    let errors = validator
        .patient_registration(&raw(payload), now())
        .unwrap_err();

    assert!(errors.has_field("gender"));
}

#[test]
fn appointment_create_accepts_future_schedule() {
    let validator = IntakeValidator::with_default_rules();

    let record = validator
        .appointment_create(&raw(create_payload()), now())
        .unwrap();

    assert_eq!(record.user_id, "user-1");
    assert_eq!(record.patient_id, "patient-1");
    assert_eq!(record.reason, "checkup");
    assert_eq!(record.schedule, Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap());
    assert_eq!(record.note, None);
}

#[test]
fn appointment_create_rejects_empty_reason() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = create_payload();
    payload["reason"] = json!("   ");

    let errors = validator
        .appointment_create(&raw(payload), now())
        .unwrap_err();

    assert_eq!(errors.messages_for("reason"), vec!["reason is required"]);
}

#[test]
fn appointment_create_schedule_respects_grace_window() {
    let validator = IntakeValidator::new(IntakeValidationRules::default().with_schedule_grace(5));

    let mut recent = create_payload();
    recent["schedule"] = json!((now() - Duration::minutes(3)).to_rfc3339());
    assert!(validator.appointment_create(&raw(recent), now()).is_ok());

    let mut stale = create_payload();
    stale["schedule"] = json!((now() - Duration::hours(1)).to_rfc3339());
    let errors = validator.appointment_create(&raw(stale), now()).unwrap_err();
    assert_eq!(
        errors.messages_for("schedule"),
        vec!["schedule must be in the present or future"]
    );
}

#[test]
fn oversized_grace_window_is_capped() {
    let rules = IntakeValidationRules::default().with_schedule_grace(100_000_000_000_000);
    assert_eq!(rules.schedule_grace_minutes, MAX_SCHEDULE_GRACE_MINUTES);

    let mut unchecked = IntakeValidationRules::default();
    unchecked.schedule_grace_minutes = i64::MAX;
    let validator = IntakeValidator::new(unchecked);

    let mut last_month = create_payload();
    last_month["schedule"] = json!((now() - Duration::days(30)).to_rfc3339());
    let errors = validator.appointment_create(&raw(last_month), now()).unwrap_err();
    assert!(errors.has_field("schedule"));

    let mut yesterday = create_payload();
    yesterday["schedule"] = json!((now() - Duration::days(1)).to_rfc3339());
    assert!(validator.appointment_create(&raw(yesterday), now()).is_ok());
}

#[test]
fn appointment_create_rejects_unparseable_schedule() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = create_payload();
    payload["schedule"] = json!("tomorrow at ten");
    payload.as_object_mut().unwrap().remove("patient");

    let errors = validator
        .appointment_create(&raw(payload), now())
        .unwrap_err();

    assert_eq!(errors.messages_for("schedule"), vec!["schedule must be a valid date-time"]);
    assert_eq!(errors.messages_for("patient"), vec!["patient is required"]);
}

#[test]
fn appointment_schedule_reason_is_optional() {
    let validator = IntakeValidator::with_default_rules();

    let record = validator
        .appointment_schedule(&raw(json!({
            "primaryPhysician": "Dr. Lee",
            "schedule": "2026-10-17T10:00"
        })))
        .unwrap();

    assert_eq!(record.reason, None);
    assert_eq!(record.schedule, Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap());
}

#[test]
fn appointment_cancel_only_needs_reason() {
    let validator = IntakeValidator::with_default_rules();

    let record = validator
        .submit(
            SubmissionKind::AppointmentCancel,
            &raw(json!({ "cancellationReason": "patient request" })),
        )
        .unwrap();
    assert_eq!(record.kind(), SubmissionKind::AppointmentCancel);

    let too_long = "x".repeat(501);
    let errors = validator
        .appointment_cancel(&raw(json!({ "cancellationReason": too_long })))
        .unwrap_err();
    assert_eq!(
        errors.messages_for("cancellationReason"),
        vec!["cancellationReason must be at most 500 characters"]
    );
}

#[test]
fn text_is_kept_verbatim() {
    let validator = IntakeValidator::with_default_rules();
    let mut payload = create_payload();
    payload["reason"] = json!("  follow-up  ");

    let record = validator.appointment_create(&raw(payload), now()).unwrap();
    assert_eq!(record.reason, "  follow-up  ");
}
