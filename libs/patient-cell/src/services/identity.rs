use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{equal_query, AppwriteClient, BackendError};

use crate::models::{Identity, IdentityError, NewIdentity};

/// Identity collaborator. `create_identity` must report a duplicate email as `Conflict`.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, IdentityError>;

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError>;
}

#[derive(Default)]
pub struct InMemoryIdentityService {
    identities: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, IdentityError> {
        let mut identities = self.identities.write().await;

        if identities.contains_key(&identity.email) {
            return Err(IdentityError::Conflict(identity.email.clone()));
        }

        let created = Identity {
            id: Uuid::new_v4().simple().to_string(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            phone: Some(identity.phone.clone()),
        };
        identities.insert(created.email.clone(), created.clone());

        Ok(created)
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.identities.read().await.get(email).cloned())
    }
}

// ==============================================================================
// BACKEND USERS API
// ==============================================================================

#[derive(Debug, Deserialize)]
struct BackendUser {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: Option<String>,
}

impl From<BackendUser> for Identity {
    fn from(user: BackendUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone.filter(|phone| !phone.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackendUserList {
    users: Vec<BackendUser>,
}

pub struct AppwriteIdentityService {
    client: AppwriteClient,
}

impl AppwriteIdentityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: AppwriteClient::new(config),
        }
    }
}

#[async_trait]
impl IdentityService for AppwriteIdentityService {
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, IdentityError> {
        debug!("Creating identity for {}", identity.email);

        let body = json!({
            "userId": "unique()",
            "email": identity.email,
            "phone": identity.phone,
            "name": identity.name,
        });

        match self
            .client
            .request::<BackendUser>(Method::POST, "/users", &[], Some(body))
            .await
        {
            Ok(user) => Ok(user.into()),
            Err(BackendError::Conflict(_)) => Err(IdentityError::Conflict(identity.email.clone())),
            Err(e) => {
                error!("Failed to create identity for {}: {}", identity.email, e);
                Err(IdentityError::Service(e.to_string()))
            }
        }
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        debug!("Looking up identity for {}", email);

        let query = [("queries[]", equal_query("email", email))];
        let list: BackendUserList = self
            .client
            .request(Method::GET, "/users", &query, None)
            .await
            .map_err(|e| IdentityError::Service(e.to_string()))?;

        Ok(list.users.into_iter().next().map(Identity::from))
    }
}
