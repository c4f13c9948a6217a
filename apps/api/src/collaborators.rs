use std::sync::Arc;

use tracing::{info, warn};

use appointment_cell::services::{
    AppointmentStore, AppwriteAppointmentStore, AppwriteSmsNotifier, BookingNotifier,
    InMemoryAppointmentStore, LogNotifier,
};
use patient_cell::services::{
    AppwriteIdentityService, AppwritePatientStore, IdentityService, InMemoryIdentityService,
    InMemoryPatientStore, PatientStore,
};
use shared_config::AppConfig;

/// The outside systems the services talk to, built once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub identities: Arc<dyn IdentityService>,
    pub patients: Arc<dyn PatientStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub notifier: Arc<dyn BookingNotifier>,
}

impl Collaborators {
    pub fn in_memory() -> Self {
        Self {
            identities: Arc::new(InMemoryIdentityService::new()),
            patients: Arc::new(InMemoryPatientStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn appwrite(config: &AppConfig) -> Self {
        Self {
            identities: Arc::new(AppwriteIdentityService::new(config)),
            patients: Arc::new(AppwritePatientStore::new(config)),
            appointments: Arc::new(AppwriteAppointmentStore::new(config)),
            notifier: Arc::new(AppwriteSmsNotifier::new(config)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        if config.is_configured() {
            info!("Using backend at {}", config.appwrite_endpoint);
            Self::appwrite(config)
        } else {
            warn!("Backend is not fully configured, keeping all records in memory");
            Self::in_memory()
        }
    }
}
