use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use intake_cell::models::{PatientRegistration, ValidationErrors};

/// An account held by the identity collaborator; `id` is opaque and backend-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdentity {
    pub email: String,
    pub phone: String,
    pub name: String,
}

impl NewIdentity {
    pub fn from_registration(registration: &PatientRegistration) -> Self {
        Self {
            email: registration.email.clone(),
            phone: registration.phone.clone(),
            name: registration.name.clone(),
        }
    }
}

/// The stored patient profile, keyed by the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub user_id: String,
    #[serde(flatten)]
    pub profile: PatientRegistration,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(identity: &Identity, profile: PatientRegistration, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.id.clone(),
            profile,
            created_at,
        }
    }

    pub fn email(&self) -> &str {
        &self.profile.email
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub patient: Patient,
    /// False when an earlier registration for the same email was returned instead.
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct PatientLookupQuery {
    pub email: String,
}

// Error types

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity already exists for {0}")]
    Conflict(String),

    #[error("Identity service error: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum PatientStoreError {
    #[error("Patient record already exists for {0}")]
    Conflict(String),

    #[error("Patient store error: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    IdentityService(IdentityError),

    #[error(transparent)]
    PatientStore(PatientStoreError),
}
