use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Thin REST client for the hosted backend (users, documents, messaging).
pub struct AppwriteClient {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: String,
}

impl AppwriteClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.appwrite_endpoint.trim_end_matches('/').to_string(),
            project_id: config.appwrite_project_id.clone(),
            api_key: config.appwrite_api_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();

        headers.insert("X-Appwrite-Project", HeaderValue::from_str(&self.project_id)?);
        headers.insert("X-Appwrite-Key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers()?);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;

            return Err(match status {
                StatusCode::CONFLICT => BackendError::Conflict(error_text),
                StatusCode::NOT_FOUND => BackendError::NotFound(error_text),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    error!("Backend rejected credentials ({}): {}", status, error_text);
                    BackendError::Auth(error_text)
                }
                _ => {
                    error!("API error ({}): {}", status, error_text);
                    BackendError::Api {
                        status: status.as_u16(),
                        body: error_text,
                    }
                }
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Builds an equality query in the backend's JSON query syntax.
pub fn equal_query(attribute: &str, value: &str) -> String {
    serde_json::json!({
        "method": "equal",
        "attribute": attribute,
        "values": [value],
    })
    .to_string()
}
