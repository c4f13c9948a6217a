// libs/appointment-cell/src/services/notification.rs
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::AppwriteClient;

use crate::models::{BookingNotification, NotificationError};

/// Fire-and-forget delivery of booking events to the requesting user.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotificationError>;
}

/// Writes notifications to the log; used when no messaging backend is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl BookingNotifier for LogNotifier {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotificationError> {
        info!(
            kind = %notification.kind,
            recipient = %notification.recipient,
            appointment_id = %notification.appointment_id,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Sends the message as an SMS targeted at the recipient's user account.
pub struct AppwriteSmsNotifier {
    client: AppwriteClient,
}

impl AppwriteSmsNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: AppwriteClient::new(config),
        }
    }
}

#[async_trait]
impl BookingNotifier for AppwriteSmsNotifier {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotificationError> {
        debug!("Sending {} SMS to {}", notification.kind, notification.recipient);

        let body = json!({
            "messageId": Uuid::new_v4().simple().to_string(),
            "content": notification.message,
            "topics": [],
            "users": [notification.recipient],
        });

        let _: Value = self
            .client
            .request(Method::POST, "/messaging/messages/sms", &[], Some(body))
            .await?;

        Ok(())
    }
}
