// libs/intake-cell/src/services/validator.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::models::{
    AppointmentCancel, AppointmentCreate, AppointmentSchedule, IntakeValidationRules,
    NormalizedRecord, MAX_SCHEDULE_GRACE_MINUTES, PatientRegistration, RawFields, SubmissionKind, ValidationErrors,
};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^\+?[0-9]{10,15}$";
const MAX_EMAIL_LENGTH: usize = 254;

/// Turns raw form payloads into typed records, or into a full list of field errors.
pub struct IntakeValidator {
    rules: IntakeValidationRules,
    email_regex: Regex,
    phone_regex: Regex,
}

impl IntakeValidator {
    pub fn new(rules: IntakeValidationRules) -> Self {
        Self {
            rules,
            email_regex: Regex::new(EMAIL_PATTERN).expect("email pattern is valid"),
            phone_regex: Regex::new(PHONE_PATTERN).expect("phone pattern is valid"),
        }
    }

    pub fn with_default_rules() -> Self {
        Self::new(IntakeValidationRules::default())
    }

    pub fn rules(&self) -> &IntakeValidationRules {
        &self.rules
    }

    pub fn submit(&self, kind: SubmissionKind, raw: &RawFields) -> Result<NormalizedRecord, ValidationErrors> {
        self.submit_at(kind, raw, Utc::now())
    }

    /// Same as `submit`, evaluating time-relative rules against `now`.
    #[instrument(skip_all, fields(kind = %kind))]
    pub fn submit_at(
        &self,
        kind: SubmissionKind,
        raw: &RawFields,
        now: DateTime<Utc>,
    ) -> Result<NormalizedRecord, ValidationErrors> {
        let result = match kind {
            SubmissionKind::PatientRegistration => self
                .patient_registration(raw, now)
                .map(NormalizedRecord::PatientRegistration),
            SubmissionKind::AppointmentCreate => self
                .appointment_create(raw, now)
                .map(NormalizedRecord::AppointmentCreate),
            SubmissionKind::AppointmentSchedule => self
                .appointment_schedule(raw)
                .map(NormalizedRecord::AppointmentSchedule),
            SubmissionKind::AppointmentCancel => self
                .appointment_cancel(raw)
                .map(NormalizedRecord::AppointmentCancel),
        };

        match &result {
            Ok(_) => debug!("Accepted {} submission", kind),
            Err(errors) => debug!("Rejected {} submission: {}", kind, errors),
        }

        result
    }

    pub fn patient_registration(
        &self,
        raw: &RawFields,
        now: DateTime<Utc>,
    ) -> Result<PatientRegistration, ValidationErrors> {
        let rules = &self.rules;
        let mut r = FieldReader::new(raw);

        let name = r.required_text("name", rules.min_name_length, rules.max_name_length);
        let email = self.email(&mut r, "email");
        let phone = self.phone(&mut r, "phone");

        let birth_date = r.date("birthDate");
        if let Some(date) = birth_date {
            if date > now.date_naive() {
                r.add("birthDate", "birth date cannot be in the future");
            }
        }

        let gender = r.required_str("gender").and_then(|value| match value.parse() {
            Ok(gender) => Some(gender),
            Err(()) => {
                r.add("gender", "gender must be one of male, female, other");
                None
            }
        });

        let address = r.required_text("address", rules.min_text_length, rules.max_text_length);
        let occupation = r.required_text("occupation", rules.min_text_length, rules.max_text_length);
        let emergency_contact_name =
            r.required_text("emergencyContactName", rules.min_name_length, rules.max_name_length);
        let emergency_contact_number = self.phone(&mut r, "emergencyContactNumber");
        let primary_physician = r.required_text("primaryPhysician", 1, rules.max_name_length);
        let insurance_provider =
            r.required_text("insuranceProvider", rules.min_name_length, rules.max_name_length);
        let insurance_policy_number =
            r.required_text("insurancePolicyNumber", rules.min_name_length, rules.max_name_length);

        let allergies = r.optional_text("allergies", rules.max_text_length);
        let current_medication = r.optional_text("currentMedication", rules.max_text_length);
        let family_medical_history = r.optional_text("familyMedicalHistory", rules.max_text_length);
        let past_medical_history = r.optional_text("pastMedicalHistory", rules.max_text_length);

        let identification_type = r.optional_text("identificationType", rules.max_name_length);
        let identification_number = r.optional_text("identificationNumber", rules.max_name_length);
        if identification_type.is_some()
            && identification_number.is_none()
            && !r.has_error("identificationNumber")
        {
            r.add(
                "identificationNumber",
                "identification number is required when identification type is set",
            );
        }
        let identification_document = r.optional_text("identificationDocument", rules.max_text_length);

        let treatment_consent = r.consent("treatmentConsent");
        let disclosure_consent = r.consent("disclosureConsent");
        let privacy_consent = r.consent("privacyConsent");

        let record = (|| {
            Some(PatientRegistration {
                name: name?,
                email: email?,
                phone: phone?,
                birth_date: birth_date?,
                gender: gender?,
                address: address?,
                occupation: occupation?,
                emergency_contact_name: emergency_contact_name?,
                emergency_contact_number: emergency_contact_number?,
                primary_physician: primary_physician?,
                insurance_provider: insurance_provider?,
                insurance_policy_number: insurance_policy_number?,
                allergies,
                current_medication,
                family_medical_history,
                past_medical_history,
                identification_type,
                identification_number,
                identification_document,
                treatment_consent,
                disclosure_consent,
                privacy_consent,
            })
        })();

        r.into_result(record)
    }

    pub fn appointment_create(
        &self,
        raw: &RawFields,
        now: DateTime<Utc>,
    ) -> Result<AppointmentCreate, ValidationErrors> {
        let rules = &self.rules;
        let mut r = FieldReader::new(raw);

        let user_id = r.required_text("userId", 1, rules.max_text_length);
        let patient_id = r.required_text("patient", 1, rules.max_text_length);
        let primary_physician = r.required_text("primaryPhysician", 1, rules.max_name_length);

        let schedule = r.date_time("schedule");
        if let Some(at) = schedule {
            let grace = Duration::minutes(rules.schedule_grace_minutes.clamp(0, MAX_SCHEDULE_GRACE_MINUTES));
            let earliest = now.checked_sub_signed(grace).unwrap_or(DateTime::<Utc>::MIN_UTC);
            if at < earliest {
                r.add("schedule", "schedule must be in the present or future");
            }
        }

        let reason = r.required_text("reason", 1, rules.max_reason_length);
        let note = r.optional_text("note", rules.max_text_length);

        let record = (|| {
            Some(AppointmentCreate {
                user_id: user_id?,
                patient_id: patient_id?,
                primary_physician: primary_physician?,
                schedule: schedule?,
                reason: reason?,
                note,
            })
        })();

        r.into_result(record)
    }

    pub fn appointment_schedule(&self, raw: &RawFields) -> Result<AppointmentSchedule, ValidationErrors> {
        let rules = &self.rules;
        let mut r = FieldReader::new(raw);

        let primary_physician = r.required_text("primaryPhysician", 1, rules.max_name_length);
        let schedule = r.date_time("schedule");
        let reason = r.optional_text("reason", rules.max_reason_length);
        let note = r.optional_text("note", rules.max_text_length);

        let record = (|| {
            Some(AppointmentSchedule {
                primary_physician: primary_physician?,
                schedule: schedule?,
                reason,
                note,
            })
        })();

        r.into_result(record)
    }

    pub fn appointment_cancel(&self, raw: &RawFields) -> Result<AppointmentCancel, ValidationErrors> {
        let mut r = FieldReader::new(raw);

        let cancellation_reason = r.required_text("cancellationReason", 1, self.rules.max_reason_length);

        let record = cancellation_reason.map(|cancellation_reason| AppointmentCancel { cancellation_reason });
        r.into_result(record)
    }

    /// Trimmed, lower-cased email; the dedup key for patient identities.
    fn email(&self, r: &mut FieldReader<'_>, field: &str) -> Option<String> {
        let value = r.required_str(field)?.trim().to_lowercase();
        if value.len() > MAX_EMAIL_LENGTH || !self.email_regex.is_match(&value) {
            r.add(field, "invalid email address");
            return None;
        }
        Some(value)
    }

    fn phone(&self, r: &mut FieldReader<'_>, field: &str) -> Option<String> {
        if let Some(Value::Number(_)) = r.raw.get(field) {
            r.add(field, "phone number must be provided as text");
            return None;
        }

        let value = r.required_str(field)?.trim();
        if !self.phone_regex.is_match(value) {
            r.add(field, "phone number must contain 10 to 15 digits with an optional leading +");
            return None;
        }
        Some(value.to_string())
    }
}

impl Default for IntakeValidator {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date_time(value).map(|at| at.date_naive()))
}

// ==============================================================================
// FIELD READER
// ==============================================================================

/// Reads fields out of a raw payload while accumulating every error it meets.
struct FieldReader<'a> {
    raw: &'a RawFields,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    fn new(raw: &'a RawFields) -> Self {
        Self {
            raw,
            errors: ValidationErrors::new(),
        }
    }

    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    fn has_error(&self, field: &str) -> bool {
        self.errors.has_field(field)
    }

    /// `None` for absent, null or whitespace-only values.
    fn optional_str(&mut self, field: &str) -> Option<&'a str> {
        match self.raw.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) if value.trim().is_empty() => None,
            Some(Value::String(value)) => Some(value.as_str()),
            Some(_) => {
                self.add(field, format!("{} must be text", field));
                None
            }
        }
    }

    fn required_str(&mut self, field: &str) -> Option<&'a str> {
        let before = self.errors.len();
        let value = self.optional_str(field);
        if value.is_none() && self.errors.len() == before {
            self.add(field, format!("{} is required", field));
        }
        value
    }

    /// The minimum counts trimmed characters, the maximum counts the stored text.
    fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) -> bool {
        if value.trim().chars().count() < min {
            self.add(field, format!("{} must be at least {} characters", field, min));
            false
        } else if value.chars().count() > max {
            self.add(field, format!("{} must be at most {} characters", field, max));
            false
        } else {
            true
        }
    }

    fn required_text(&mut self, field: &str, min: usize, max: usize) -> Option<String> {
        let value = self.required_str(field)?;
        self.check_length(field, value, min, max).then(|| value.to_string())
    }

    fn optional_text(&mut self, field: &str, max: usize) -> Option<String> {
        let value = self.optional_str(field)?;
        self.check_length(field, value, 1, max).then(|| value.to_string())
    }

    fn date_time(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let value = self.required_str(field)?;
        let parsed = parse_date_time(value);
        if parsed.is_none() {
            self.add(field, format!("{} must be a valid date-time", field));
        }
        parsed
    }

    fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = self.required_str(field)?;
        let parsed = parse_date(value);
        if parsed.is_none() {
            self.add(field, format!("{} must be a valid date", field));
        }
        parsed
    }

    /// Only a literal JSON `true` counts as consent.
    fn consent(&mut self, field: &str) -> bool {
        match self.raw.get(field) {
            Some(Value::Bool(true)) => true,
            _ => {
                self.add(field, "consent required");
                false
            }
        }
    }

    fn into_result<T>(self, record: Option<T>) -> Result<T, ValidationErrors> {
        match record {
            Some(record) if self.errors.is_empty() => Ok(record),
            _ if !self.errors.is_empty() => Err(self.errors),
            _ => Err(ValidationErrors::single("submission", "submission could not be normalized")),
        }
    }
}
