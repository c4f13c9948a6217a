// libs/intake-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use shared_models::error::FieldError;

/// Untyped form payload exactly as it arrived (a JSON object).
pub type RawFields = serde_json::Map<String, serde_json::Value>;

// ==============================================================================
// SUBMISSION KINDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionKind {
    PatientRegistration,
    AppointmentCreate,
    AppointmentSchedule,
    AppointmentCancel,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::PatientRegistration => "patient-registration",
            SubmissionKind::AppointmentCreate => "appointment-create",
            SubmissionKind::AppointmentSchedule => "appointment-schedule",
            SubmissionKind::AppointmentCancel => "appointment-cancel",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "patient-registration" => Ok(SubmissionKind::PatientRegistration),
            "appointment-create" => Ok(SubmissionKind::AppointmentCreate),
            "appointment-schedule" => Ok(SubmissionKind::AppointmentSchedule),
            "appointment-cancel" => Ok(SubmissionKind::AppointmentCancel),
            other => Err(format!("Unknown submission kind: '{}'", other)),
        }
    }
}

// ==============================================================================
// VALIDATION ERRORS
// ==============================================================================

/// Every field-level problem found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{} invalid field(s): {}", .errors.len(), summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn into_fields(self) -> Vec<FieldError> {
        self.errors
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ==============================================================================
// NORMALIZED RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub occupation: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub primary_physician: String,
    pub insurance_provider: String,
    pub insurance_policy_number: String,
    pub allergies: Option<String>,
    pub current_medication: Option<String>,
    pub family_medical_history: Option<String>,
    pub past_medical_history: Option<String>,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
    pub identification_document: Option<String>,
    pub treatment_consent: bool,
    pub disclosure_consent: bool,
    pub privacy_consent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCreate {
    pub user_id: String,
    pub patient_id: String,
    pub primary_physician: String,
    pub schedule: DateTime<Utc>,
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSchedule {
    pub primary_physician: String,
    pub schedule: DateTime<Utc>,
    pub reason: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCancel {
    pub cancellation_reason: String,
}

/// Output of a successful validation, one variant per submission kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "kebab-case")]
pub enum NormalizedRecord {
    PatientRegistration(PatientRegistration),
    AppointmentCreate(AppointmentCreate),
    AppointmentSchedule(AppointmentSchedule),
    AppointmentCancel(AppointmentCancel),
}

impl NormalizedRecord {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            NormalizedRecord::PatientRegistration(_) => SubmissionKind::PatientRegistration,
            NormalizedRecord::AppointmentCreate(_) => SubmissionKind::AppointmentCreate,
            NormalizedRecord::AppointmentSchedule(_) => SubmissionKind::AppointmentSchedule,
            NormalizedRecord::AppointmentCancel(_) => SubmissionKind::AppointmentCancel,
        }
    }
}

// ==============================================================================
// VALIDATION RULES
// ==============================================================================

/// Upper bound for the schedule grace window (one week).
pub const MAX_SCHEDULE_GRACE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone)]
pub struct IntakeValidationRules {
    pub min_name_length: usize,
    pub max_name_length: usize,
    pub min_text_length: usize,
    pub max_text_length: usize,
    pub max_reason_length: usize,
    /// How far in the past a "present" appointment schedule may be.
    pub schedule_grace_minutes: i64,
}

impl Default for IntakeValidationRules {
    fn default() -> Self {
        Self {
            min_name_length: 2,
            max_name_length: 50,
            min_text_length: 2,
            max_text_length: 500,
            max_reason_length: 500,
            schedule_grace_minutes: 5,
        }
    }
}

impl IntakeValidationRules {
    pub fn with_schedule_grace(mut self, minutes: i64) -> Self {
        self.schedule_grace_minutes = minutes.clamp(0, MAX_SCHEDULE_GRACE_MINUTES);
        self
    }
}
