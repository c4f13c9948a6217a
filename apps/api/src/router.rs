use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::AppointmentBookingService;
use appointment_cell::AppointmentState;
use intake_cell::services::IntakeValidator;
use patient_cell::router::patient_routes;
use patient_cell::services::PatientRegistryService;
use patient_cell::PatientState;
use shared_config::AppConfig;

use crate::collaborators::Collaborators;

pub fn create_router(config: Arc<AppConfig>, collaborators: Collaborators) -> Router {
    let registry = PatientRegistryService::new(
        IntakeValidator::with_default_rules(),
        collaborators.identities,
        collaborators.patients,
    );
    let booking = AppointmentBookingService::from_config(
        &config,
        collaborators.appointments,
        collaborators.notifier,
    );

    Router::new()
        .route("/", get(|| async { "Clinic intake API is running!" }))
        .nest(
            "/patients",
            patient_routes(PatientState::new(config.clone(), Arc::new(registry))),
        )
        .nest(
            "/appointments",
            appointment_routes(AppointmentState::new(config, Arc::new(booking))),
        )
}
