use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub appwrite_endpoint: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            appwrite_endpoint: "http://localhost:8080/v1".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the backend endpoint at a mock server (e.g. `MockServer::uri()`).
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            appwrite_endpoint: endpoint.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            appwrite_endpoint: self.appwrite_endpoint.clone(),
            appwrite_project_id: "test-project".to_string(),
            appwrite_api_key: "test-api-key".to_string(),
            appwrite_database_id: "test-db".to_string(),
            patient_collection_id: "patients".to_string(),
            appointment_collection_id: "appointments".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("patient@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn bearer(user: &TestUser, config: &TestConfig) -> String {
        format!("Bearer {}", Self::create_test_token(user, &config.jwt_secret, None))
    }
}

/// Canned backend payloads for wiremock-based collaborator tests.
pub struct MockAppwriteResponses;

impl MockAppwriteResponses {
    pub fn user_response(user_id: &str, email: &str, name: &str) -> serde_json::Value {
        json!({
            "$id": user_id,
            "name": name,
            "email": email,
            "phone": "+15551234567",
            "status": true,
            "$createdAt": "2026-01-01T00:00:00.000+00:00"
        })
    }

    pub fn user_list_response(users: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "total": users.len(),
            "users": users
        })
    }

    pub fn document_list_response(documents: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "total": documents.len(),
            "documents": documents
        })
    }

    pub fn error_response(message: &str, code: u16, kind: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code,
            "type": kind
        })
    }
}
