// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use intake_cell::models::RawFields;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;

use crate::models::{Appointment, AppointmentError};
use crate::services::booking::AppointmentBookingService;

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, booking: Arc<AppointmentBookingService>) -> Self {
        Self { config, booking }
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::Validation(errors) => AppError::InvalidFields(errors.into_fields()),
            AppointmentError::NotFound(id) => AppError::NotFound(format!("Appointment {} not found", id)),
            e @ AppointmentError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            AppointmentError::Persistence(e) => AppError::ExternalService(e.to_string()),
        }
    }
}

fn into_raw_fields(payload: Value) -> Result<RawFields, AppError> {
    match payload {
        Value::Object(fields) => Ok(fields),
        _ => Err(AppError::BadRequest("Request body must be a JSON object".to_string())),
    }
}

fn appointment_response(booking: &AppointmentBookingService, appointment: &Appointment) -> Value {
    json!({
        "success": true,
        "appointment": appointment,
        "allowed_actions": booking.allowed_actions(appointment),
    })
}

/// Staff may act on any appointment; everyone else only on their own.
fn ensure_owner_or_staff(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.is_staff() || appointment.is_owned_by(&user.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this appointment".to_string()))
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

/// The caller becomes the requesting user regardless of any `userId` in the body.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut raw = into_raw_fields(payload)?;
    raw.insert("userId".to_string(), Value::String(user.id.clone()));

    let appointment = state.booking.create_appointment(&raw).await?;

    Ok((
        StatusCode::CREATED,
        Json(appointment_response(&state.booking, &appointment)),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    ensure_owner_or_staff(&user, &appointment)?;

    Ok(Json(appointment_response(&state.booking, &appointment)))
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;
    debug!("User {} scheduling appointment {}", user.id, appointment_id);

    let raw = into_raw_fields(payload)?;
    let appointment = state.booking.schedule_appointment(appointment_id, &raw).await?;

    Ok(Json(appointment_response(&state.booking, &appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let raw = into_raw_fields(payload)?;

    let existing = state.booking.get_appointment(appointment_id).await?;
    ensure_owner_or_staff(&user, &existing)?;

    let appointment = state.booking.cancel_appointment(appointment_id, &raw).await?;

    Ok(Json(appointment_response(&state.booking, &appointment)))
}
