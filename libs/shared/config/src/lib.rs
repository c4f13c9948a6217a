use std::env;
use tracing::warn;

const DEFAULT_SCHEDULE_GRACE_MINUTES: i64 = 5;
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub appwrite_endpoint: String,
    pub appwrite_project_id: String,
    pub appwrite_api_key: String,
    pub appwrite_database_id: String,
    pub patient_collection_id: String,
    pub appointment_collection_id: String,
    pub jwt_secret: String,
    pub schedule_grace_minutes: i64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            appwrite_endpoint: required_var("APPWRITE_ENDPOINT"),
            appwrite_project_id: required_var("APPWRITE_PROJECT_ID"),
            appwrite_api_key: required_var("APPWRITE_API_KEY"),
            appwrite_database_id: required_var("APPWRITE_DATABASE_ID"),
            patient_collection_id: required_var("PATIENT_COLLECTION_ID"),
            appointment_collection_id: required_var("APPOINTMENT_COLLECTION_ID"),
            jwt_secret: required_var("JWT_SECRET"),
            schedule_grace_minutes: parsed_var("SCHEDULE_GRACE_MINUTES", DEFAULT_SCHEDULE_GRACE_MINUTES),
            port: parsed_var("PORT", DEFAULT_PORT),
        }
    }

    /// True when every value needed to reach the hosted backend is present.
    pub fn is_configured(&self) -> bool {
        !self.appwrite_endpoint.is_empty()
            && !self.appwrite_project_id.is_empty()
            && !self.appwrite_api_key.is_empty()
            && !self.appwrite_database_id.is_empty()
            && !self.patient_collection_id.is_empty()
            && !self.appointment_collection_id.is_empty()
    }

    pub fn is_auth_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            appwrite_endpoint: String::new(),
            appwrite_project_id: String::new(),
            appwrite_api_key: String::new(),
            appwrite_database_id: String::new(),
            patient_collection_id: String::new(),
            appointment_collection_id: String::new(),
            jwt_secret: String::new(),
            schedule_grace_minutes: DEFAULT_SCHEDULE_GRACE_MINUTES,
            port: DEFAULT_PORT,
        }
    }
}

fn required_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn parsed_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
