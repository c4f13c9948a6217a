// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use intake_cell::models::{IntakeValidationRules, RawFields};
use intake_cell::services::IntakeValidator;
use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentAction, AppointmentError, AppointmentTransition, BookingEventKind,
    BookingNotification, StoreError,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notification::BookingNotifier;
use crate::services::store::AppointmentStore;

/// Applies validated create/schedule/cancel transitions to stored appointments.
pub struct AppointmentBookingService {
    validator: IntakeValidator,
    lifecycle: AppointmentLifecycleService,
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn BookingNotifier>,
}

impl AppointmentBookingService {
    pub fn new(
        validator: IntakeValidator,
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self {
        Self {
            validator,
            lifecycle: AppointmentLifecycleService::new(),
            store,
            notifier,
        }
    }

    /// Uses the configured schedule grace window for "present" schedules.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self {
        let rules = IntakeValidationRules::default().with_schedule_grace(config.schedule_grace_minutes);
        Self::new(IntakeValidator::new(rules), store, notifier)
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle
    }

    pub async fn create_appointment(&self, raw: &RawFields) -> Result<Appointment, AppointmentError> {
        let request = self.validator.appointment_create(raw, Utc::now())?;
        self.apply(AppointmentTransition::Create(request)).await
    }

    pub async fn schedule_appointment(
        &self,
        appointment_id: Uuid,
        raw: &RawFields,
    ) -> Result<Appointment, AppointmentError> {
        let details = self.validator.appointment_schedule(raw)?;
        self.apply(AppointmentTransition::Schedule {
            appointment_id,
            details,
        })
        .await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        raw: &RawFields,
    ) -> Result<Appointment, AppointmentError> {
        let details = self.validator.appointment_cancel(raw)?;
        self.apply(AppointmentTransition::Cancel {
            appointment_id,
            details,
        })
        .await
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    /// Commits one transition. Nothing is written unless the guard and the
    /// record invariants pass, and the notification only goes out after the
    /// store acknowledged the write.
    pub async fn apply(&self, transition: AppointmentTransition) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let action = transition.action();

        let (appointment, event) = match transition {
            AppointmentTransition::Create(request) => {
                (Appointment::pending(request, now), BookingEventKind::BookingRequested)
            }
            AppointmentTransition::Schedule {
                appointment_id,
                details,
            } => {
                let mut appointment = self.get_appointment(appointment_id).await?;
                appointment.status = self.lifecycle.validate_transition(appointment.status, action)?;
                appointment.primary_physician = details.primary_physician;
                appointment.schedule = details.schedule;
                if let Some(reason) = details.reason {
                    appointment.reason = reason;
                }
                if details.note.is_some() {
                    appointment.note = details.note;
                }
                appointment.updated_at = now;
                (appointment, BookingEventKind::BookingConfirmed)
            }
            AppointmentTransition::Cancel {
                appointment_id,
                details,
            } => {
                let mut appointment = self.get_appointment(appointment_id).await?;
                appointment.status = self.lifecycle.validate_transition(appointment.status, action)?;
                appointment.cancellation_reason = Some(details.cancellation_reason);
                appointment.updated_at = now;
                (appointment, BookingEventKind::BookingCancelled)
            }
        };

        appointment.check_invariants()?;
        match self.store.put_appointment(&appointment).await {
            Ok(()) => {}
            Err(StoreError::Conflict { current, .. }) => {
                warn!("Appointment {} changed to {} before {} was written", appointment.id, current, action);
                return Err(AppointmentError::InvalidTransition { from: current, action });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "Appointment {} is now {} after {}",
            appointment.id, appointment.status, action
        );

        self.dispatch(BookingNotification::for_appointment(event, &appointment));

        Ok(appointment)
    }

    pub fn allowed_actions(&self, appointment: &Appointment) -> Vec<AppointmentAction> {
        self.lifecycle.allowed_actions(appointment.status)
    }

    fn dispatch(&self, notification: BookingNotification) {
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            debug!(
                "Dispatching {} for appointment {}",
                notification.kind, notification.appointment_id
            );
            if let Err(e) = notifier.notify(&notification).await {
                warn!(
                    "Failed to deliver {} notification for appointment {}: {}",
                    notification.kind, notification.appointment_id, e
                );
            }
        });
    }
}
