use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;

use crate::models::{PatientError, PatientLookupQuery};
use crate::services::PatientRegistryService;

#[derive(Clone)]
pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<PatientRegistryService>,
}

impl PatientState {
    pub fn new(config: Arc<AppConfig>, registry: Arc<PatientRegistryService>) -> Self {
        Self { config, registry }
    }
}

impl From<PatientError> for AppError {
    fn from(error: PatientError) -> Self {
        match error {
            PatientError::Validation(errors) => AppError::InvalidFields(errors.into_fields()),
            PatientError::NotFound(email) => AppError::NotFound(format!("No patient registered for {}", email)),
            e @ (PatientError::IdentityService(_) | PatientError::PatientStore(_)) => {
                AppError::ExternalService(e.to_string())
            }
        }
    }
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<PatientState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Value::Object(raw) = payload else {
        return Err(AppError::BadRequest("Request body must be a JSON object".to_string()));
    };

    let outcome = state.registry.register_patient(&raw).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(json!({
            "success": true,
            "created": outcome.created,
            "patient": outcome.patient,
        })),
    ))
}

#[axum::debug_handler]
pub async fn lookup_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientLookupQuery>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let patient = state.registry.find_patient(&query.email).await?;

    Ok(Json(json!({ "patient": patient })))
}
