use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use intake_cell::models::RawFields;
use intake_cell::services::IntakeValidator;

use crate::models::{
    Identity, IdentityError, NewIdentity, Patient, PatientError, PatientStoreError, RegistrationOutcome,
};
use crate::services::identity::IdentityService;
use crate::services::patient_store::PatientStore;

/// Idempotent patient registration on top of the identity and patient collaborators.
pub struct PatientRegistryService {
    validator: IntakeValidator,
    identities: Arc<dyn IdentityService>,
    patients: Arc<dyn PatientStore>,
}

impl PatientRegistryService {
    pub fn new(
        validator: IntakeValidator,
        identities: Arc<dyn IdentityService>,
        patients: Arc<dyn PatientStore>,
    ) -> Self {
        Self {
            validator,
            identities,
            patients,
        }
    }

    /// Creates the identity, or returns the one already registered under the same email.
    pub async fn register_or_find(&self, identity: &NewIdentity) -> Result<Identity, PatientError> {
        match self.identities.create_identity(identity).await {
            Ok(created) => {
                info!("Created identity {} for {}", created.id, created.email);
                Ok(created)
            }
            Err(IdentityError::Conflict(_)) => {
                debug!("Identity for {} already exists, looking it up", identity.email);
                self.identities
                    .find_identity_by_email(&identity.email)
                    .await
                    .map_err(PatientError::IdentityService)?
                    .ok_or_else(|| {
                        warn!("Identity conflict for {} but lookup found nothing", identity.email);
                        PatientError::IdentityService(IdentityError::Service(format!(
                            "conflict reported for {} but no identity was found",
                            identity.email
                        )))
                    })
            }
            Err(e) => Err(PatientError::IdentityService(e)),
        }
    }

    /// Validates a registration form and stores the patient at most once per email.
    pub async fn register_patient(&self, raw: &RawFields) -> Result<RegistrationOutcome, PatientError> {
        let now = Utc::now();
        let registration = self.validator.patient_registration(raw, now)?;

        let identity = self
            .register_or_find(&NewIdentity::from_registration(&registration))
            .await?;
        let patient = Patient::new(&identity, registration, now);

        match self.patients.create_patient(&patient).await {
            Ok(stored) => {
                info!("Registered patient {}", stored.user_id);
                Ok(RegistrationOutcome {
                    patient: stored,
                    created: true,
                })
            }
            Err(PatientStoreError::Conflict(_)) => {
                debug!("Patient {} already registered, returning existing record", patient.email());
                let existing = self
                    .patients
                    .find_patient_by_email(patient.email())
                    .await
                    .map_err(PatientError::PatientStore)?
                    .ok_or_else(|| {
                        warn!("Patient conflict for {} but lookup found nothing", patient.email());
                        PatientError::PatientStore(PatientStoreError::Service(format!(
                            "conflict reported for {} but no patient record was found",
                            patient.email()
                        )))
                    })?;

                Ok(RegistrationOutcome {
                    patient: existing,
                    created: false,
                })
            }
            Err(e) => Err(PatientError::PatientStore(e)),
        }
    }

    pub async fn find_patient(&self, email: &str) -> Result<Patient, PatientError> {
        let email = email.trim().to_lowercase();

        let patient = self
            .patients
            .find_patient_by_email(&email)
            .await
            .map_err(PatientError::PatientStore)?;

        patient.ok_or(PatientError::NotFound(email))
    }
}
