use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_database::{equal_query, AppwriteClient, BackendError};

use crate::models::{Patient, PatientStoreError};

/// Patient profile collaborator. A second record for the same email or identity is a `Conflict`.
#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn create_patient(&self, patient: &Patient) -> Result<Patient, PatientStoreError>;

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>, PatientStoreError>;
}

#[derive(Default)]
pub struct InMemoryPatientStore {
    patients: RwLock<HashMap<String, Patient>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.patients.read().await.len()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn create_patient(&self, patient: &Patient) -> Result<Patient, PatientStoreError> {
        let mut patients = self.patients.write().await;

        let duplicate = patients.contains_key(patient.email())
            || patients.values().any(|existing| existing.user_id == patient.user_id);
        if duplicate {
            return Err(PatientStoreError::Conflict(patient.email().to_string()));
        }

        patients.insert(patient.email().to_string(), patient.clone());
        Ok(patient.clone())
    }

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>, PatientStoreError> {
        Ok(self.patients.read().await.get(email).cloned())
    }
}

// ==============================================================================
// BACKEND DOCUMENT STORE
// ==============================================================================

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Patient>,
}

/// Patients stored as documents whose id is the identity id.
pub struct AppwritePatientStore {
    client: AppwriteClient,
    database_id: String,
    collection_id: String,
}

impl AppwritePatientStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: AppwriteClient::new(config),
            database_id: config.appwrite_database_id.clone(),
            collection_id: config.patient_collection_id.clone(),
        }
    }

    fn documents_path(&self) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, self.collection_id
        )
    }
}

#[async_trait]
impl PatientStore for AppwritePatientStore {
    async fn create_patient(&self, patient: &Patient) -> Result<Patient, PatientStoreError> {
        debug!("Creating patient record for identity {}", patient.user_id);

        let data = serde_json::to_value(patient).map_err(|e| PatientStoreError::Service(e.to_string()))?;
        let body = json!({ "documentId": patient.user_id, "data": data });

        match self
            .client
            .request::<Patient>(Method::POST, &self.documents_path(), &[], Some(body))
            .await
        {
            Ok(created) => Ok(created),
            Err(BackendError::Conflict(_)) => Err(PatientStoreError::Conflict(patient.email().to_string())),
            Err(e) => {
                error!("Failed to create patient record for {}: {}", patient.email(), e);
                Err(PatientStoreError::Service(e.to_string()))
            }
        }
    }

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>, PatientStoreError> {
        debug!("Looking up patient record for {}", email);

        let query = [("queries[]", equal_query("email", email))];
        let list: DocumentList = self
            .client
            .request(Method::GET, &self.documents_path(), &query, None)
            .await
            .map_err(|e| PatientStoreError::Service(e.to_string()))?;

        Ok(list.documents.into_iter().next())
    }
}
