// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use intake_cell::models::{AppointmentCancel, AppointmentCreate, AppointmentSchedule, ValidationErrors};
use shared_database::BackendError;

/// Rendering used in patient-facing messages, e.g. `Oct 17, 2026, 10:00 AM`.
pub const NOTIFICATION_DATETIME_FORMAT: &str = "%b %-d, %Y, %-I:%M %p";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    #[serde(rename = "patient")]
    pub patient_id: String,
    pub user_id: String,
    pub primary_physician: String,
    pub schedule: DateTime<Utc>,
    pub reason: String,
    pub note: Option<String>,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// A freshly requested appointment; `pending` is never chosen by the caller.
    pub fn pending(request: AppointmentCreate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            user_id: request.user_id,
            primary_physician: request.primary_physician,
            schedule: request.schedule,
            reason: request.reason,
            note: request.note,
            status: AppointmentStatus::Pending,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Record-level rules every stored appointment must satisfy.
    pub fn check_invariants(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let has_cancellation_reason = self
            .cancellation_reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty());

        match self.status {
            AppointmentStatus::Cancelled => {
                if !has_cancellation_reason {
                    errors.add("cancellationReason", "cancelled appointments need a cancellation reason");
                }
            }
            AppointmentStatus::Pending | AppointmentStatus::Scheduled => {
                if self.reason.trim().is_empty() {
                    errors.add("reason", "reason is required");
                }
                if self.cancellation_reason.is_some() {
                    errors.add("cancellationReason", "only cancelled appointments carry a cancellation reason");
                }
            }
        }

        if self.primary_physician.trim().is_empty() {
            errors.add("primaryPhysician", "primaryPhysician is required");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn formatted_schedule(&self) -> String {
        self.schedule.format(NOTIFICATION_DATETIME_FORMAT).to_string()
    }
}

// ==============================================================================
// TRANSITIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentAction {
    Create,
    Schedule,
    Cancel,
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentAction::Create => write!(f, "create"),
            AppointmentAction::Schedule => write!(f, "schedule"),
            AppointmentAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// A validated request to move an appointment through its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentTransition {
    Create(AppointmentCreate),
    Schedule {
        appointment_id: Uuid,
        details: AppointmentSchedule,
    },
    Cancel {
        appointment_id: Uuid,
        details: AppointmentCancel,
    },
}

impl AppointmentTransition {
    pub fn action(&self) -> AppointmentAction {
        match self {
            AppointmentTransition::Create(_) => AppointmentAction::Create,
            AppointmentTransition::Schedule { .. } => AppointmentAction::Schedule,
            AppointmentTransition::Cancel { .. } => AppointmentAction::Cancel,
        }
    }
}

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    BookingRequested,
    BookingConfirmed,
    BookingCancelled,
}

impl fmt::Display for BookingEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingEventKind::BookingRequested => write!(f, "booking_requested"),
            BookingEventKind::BookingConfirmed => write!(f, "booking_confirmed"),
            BookingEventKind::BookingCancelled => write!(f, "booking_cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingNotification {
    pub kind: BookingEventKind,
    pub recipient: String,
    pub appointment_id: Uuid,
    pub message: String,
}

impl BookingNotification {
    /// Message addressed to the user who requested the appointment.
    pub fn for_appointment(kind: BookingEventKind, appointment: &Appointment) -> Self {
        let when = appointment.formatted_schedule();
        let message = match kind {
            BookingEventKind::BookingRequested => format!(
                "Your appointment request with {} for {} has been received.",
                appointment.primary_physician, when
            ),
            BookingEventKind::BookingConfirmed => format!(
                "Your appointment is confirmed for {} with {}.",
                when, appointment.primary_physician
            ),
            BookingEventKind::BookingCancelled => format!(
                "Your appointment for {} has been cancelled. Reason: {}.",
                when,
                appointment.cancellation_reason.as_deref().unwrap_or_default()
            ),
        };

        Self {
            kind,
            recipient: appointment.user_id.clone(),
            appointment_id: appointment.id,
            message,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Appointment store unavailable: {0}")]
    Unavailable(String),

    #[error("Appointment record is malformed: {0}")]
    Malformed(String),

    #[error("Appointment {id} is already {current}")]
    Conflict { id: Uuid, current: AppointmentStatus },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot {action} an appointment that is {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: AppointmentAction,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}
