// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{AppwriteClient, BackendError};

use crate::models::{Appointment, StoreError};

/// Persistence collaborator. Writes for the same id must be serialized by the implementation.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn put_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Refuses to replace a cancelled record, so a transition that read a stale
/// snapshot cannot overwrite an acknowledged cancellation.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn put_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut appointments = self.appointments.write().await;
        if let Some(current) = appointments.get(&appointment.id) {
            if current.status.is_terminal() {
                return Err(StoreError::Conflict {
                    id: appointment.id,
                    current: current.status,
                });
            }
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }
}

// ==============================================================================
// BACKEND DOCUMENT STORE
// ==============================================================================

/// Appointments kept as documents in the backend's appointment collection.
pub struct AppwriteAppointmentStore {
    client: AppwriteClient,
    database_id: String,
    collection_id: String,
}

impl AppwriteAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: AppwriteClient::new(config),
            database_id: config.appwrite_database_id.clone(),
            collection_id: config.appointment_collection_id.clone(),
        }
    }

    fn document_path(&self, id: Uuid) -> String {
        format!(
            "/databases/{}/collections/{}/documents/{}",
            self.database_id, self.collection_id, id
        )
    }

    fn from_document(mut document: Value) -> Result<Appointment, StoreError> {
        if let Some(fields) = document.as_object_mut() {
            if !fields.contains_key("id") {
                if let Some(document_id) = fields.get("$id").cloned() {
                    fields.insert("id".to_string(), document_id);
                }
            }
        }

        serde_json::from_value(document).map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl AppointmentStore for AppwriteAppointmentStore {
    async fn put_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        debug!("Writing appointment {} ({})", appointment.id, appointment.status);

        let data = serde_json::to_value(appointment).map_err(|e| StoreError::Malformed(e.to_string()))?;

        let _: Value = self
            .client
            .request(
                Method::PUT,
                &self.document_path(appointment.id),
                &[],
                Some(json!({ "documentId": appointment.id.to_string(), "data": data })),
            )
            .await
            .map_err(|e| {
                error!("Failed to write appointment {}: {}", appointment.id, e);
                StoreError::from(e)
            })?;

        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        debug!("Fetching appointment {}", id);

        match self
            .client
            .request::<Value>(Method::GET, &self.document_path(id), &[], None)
            .await
        {
            Ok(document) => Self::from_document(document).map(Some),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => {
                error!("Failed to fetch appointment {}: {}", id, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use intake_cell::models::AppointmentCreate;

    fn pending() -> Appointment {
        let now = Utc::now();
        Appointment::pending(
            AppointmentCreate {
                user_id: "user-1".to_string(),
                patient_id: "patient-1".to_string(),
                primary_physician: "Dr. Lee".to_string(),
                schedule: now + Duration::days(1),
                reason: "checkup".to_string(),
                note: None,
            },
            now,
        )
    }

    #[tokio::test]
    async fn cancelled_record_cannot_be_overwritten() {
        let store = InMemoryAppointmentStore::new();
        let mut appointment = pending();
        store.put_appointment(&appointment).await.unwrap();

        let mut cancelled = appointment.clone();
        cancelled.status = AppointmentStatus::Cancelled;
        cancelled.cancellation_reason = Some("patient request".to_string());
        store.put_appointment(&cancelled).await.unwrap();

        appointment.status = AppointmentStatus::Scheduled;
        assert_matches!(
            store.put_appointment(&appointment).await,
            Err(StoreError::Conflict { current: AppointmentStatus::Cancelled, .. })
        );
        assert_eq!(store.get_appointment(appointment.id).await.unwrap(), Some(cancelled));
    }
}
