//! Notification dispatch: provider traits and the best-effort dispatcher.

pub mod email;
pub mod sms;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use email::{MockEmailProvider, SmtpProvider};
pub use sms::{HttpSmsProvider, MockSmsProvider};

use crate::models::{Channel, NotificationStatus};
use crate::services::database::Database;
use crate::services::metrics::NOTIFICATIONS_TOTAL;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider_id: Option<String>,
    pub success: bool,
    pub message: Option<String>,
}

impl ProviderResponse {
    pub fn success(provider_id: Option<String>) -> Self {
        Self {
            provider_id,
            success: true,
            message: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub attachment: Option<EmailAttachment>,
}

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
}

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send(&self, sms: &SmsMessage) -> Result<ProviderResponse, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
}

/// Typed result of a best-effort notification attempt.
///
/// Callers never fail the primary operation on a bad outcome; the value is
/// returned to the client and persisted so tests can assert on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent {
        #[serde(rename = "notificationId")]
        notification_id: Uuid,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent { .. })
    }
}

/// Best-effort notification dispatcher.
///
/// Every attempt is recorded as a notification row; provider failures are
/// logged and reported as an outcome, never propagated as errors.
#[derive(Clone)]
pub struct Notifier {
    db: Database,
    email_provider: Arc<dyn EmailProvider>,
    sms_provider: Arc<dyn SmsProvider>,
    owner_email: Option<String>,
}

impl Notifier {
    pub fn new(
        db: Database,
        email_provider: Arc<dyn EmailProvider>,
        sms_provider: Arc<dyn SmsProvider>,
        owner_email: Option<String>,
    ) -> Self {
        Self {
            db,
            email_provider,
            sms_provider,
            owner_email,
        }
    }

    /// Send an email, recording the attempt and its outcome.
    #[tracing::instrument(
        skip(self, body_text, body_html, attachment),
        fields(to = %to, subject = %subject)
    )]
    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body_text: String,
        body_html: Option<String>,
        attachment: Option<EmailAttachment>,
    ) -> NotificationOutcome {
        let notification_id = Uuid::new_v4();
        if let Err(e) = self
            .db
            .insert_notification(
                notification_id,
                Channel::Email,
                to,
                Some(subject),
                Some(body_text.as_str()),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to record notification attempt");
        }

        let message = EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body_text: Some(body_text),
            body_html,
            from_name: None,
            reply_to: None,
            attachment,
        };

        let outcome = match self.email_provider.send(&message).await {
            Ok(response) => {
                self.mark(notification_id, NotificationStatus::Sent, response.provider_id, None)
                    .await;
                NotificationOutcome::Sent { notification_id }
            }
            Err(ProviderError::NotEnabled(reason)) => {
                tracing::info!(reason = %reason, "Email provider disabled, skipping send");
                self.mark(notification_id, NotificationStatus::Skipped, None, Some(reason.as_str()))
                    .await;
                NotificationOutcome::Skipped { reason }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(error = %reason, "Failed to send email");
                self.mark(notification_id, NotificationStatus::Failed, None, Some(reason.as_str()))
                    .await;
                NotificationOutcome::Failed { reason }
            }
        };

        NOTIFICATIONS_TOTAL
            .with_label_values(&["email", outcome_label(&outcome)])
            .inc();

        outcome
    }

    /// Send an SMS, recording the attempt and its outcome.
    #[tracing::instrument(skip(self, body), fields(to = %to))]
    pub async fn send_sms(&self, to: &str, body: String) -> NotificationOutcome {
        let notification_id = Uuid::new_v4();
        if let Err(e) = self
            .db
            .insert_notification(notification_id, Channel::Sms, to, None, Some(body.as_str()))
            .await
        {
            tracing::warn!(error = %e, "Failed to record notification attempt");
        }

        let message = SmsMessage {
            to: to.to_string(),
            body,
        };

        let outcome = match self.sms_provider.send(&message).await {
            Ok(response) => {
                self.mark(notification_id, NotificationStatus::Sent, response.provider_id, None)
                    .await;
                NotificationOutcome::Sent { notification_id }
            }
            Err(ProviderError::NotEnabled(reason)) => {
                tracing::info!(reason = %reason, "SMS provider disabled, skipping send");
                self.mark(notification_id, NotificationStatus::Skipped, None, Some(reason.as_str()))
                    .await;
                NotificationOutcome::Skipped { reason }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(error = %reason, "Failed to send SMS");
                self.mark(notification_id, NotificationStatus::Failed, None, Some(reason.as_str()))
                    .await;
                NotificationOutcome::Failed { reason }
            }
        };

        NOTIFICATIONS_TOTAL
            .with_label_values(&["sms", outcome_label(&outcome)])
            .inc();

        outcome
    }

    /// Notify the configured owner inbox, if one is set.
    pub async fn notify_owner(&self, subject: &str, body: String) -> NotificationOutcome {
        match self.owner_email.clone() {
            Some(owner) => self.send_email(&owner, subject, body, None, None).await,
            None => NotificationOutcome::Skipped {
                reason: "No owner notification inbox configured".to_string(),
            },
        }
    }

    async fn mark(
        &self,
        notification_id: Uuid,
        status: NotificationStatus,
        provider_id: Option<String>,
        error_message: Option<&str>,
    ) {
        if let Err(e) = self
            .db
            .update_notification_status(
                notification_id,
                status,
                provider_id.as_deref(),
                error_message,
            )
            .await
        {
            tracing::warn!(
                notification_id = %notification_id,
                error = %e,
                "Failed to update notification status"
            );
        }
    }
}

fn outcome_label(outcome: &NotificationOutcome) -> &'static str {
    match outcome {
        NotificationOutcome::Sent { .. } => "sent",
        NotificationOutcome::Skipped { .. } => "skipped",
        NotificationOutcome::Failed { .. } => "failed",
    }
}
