//! Notification audit record queries.

use super::Database;
use crate::models::{Channel, Notification, NotificationStatus};
use crate::services::metrics::DB_QUERY_DURATION;
use tracing::instrument;
use uuid::Uuid;
use vsuite_core::error::AppError;

const NOTIFICATION_COLUMNS: &str = "notification_id, channel, status, recipient, subject, \
    body, error_message, provider_id, created_utc, sent_utc, failed_utc";

impl Database {
    /// Record a queued notification attempt.
    #[instrument(skip(self, subject, body), fields(notification_id = %notification_id))]
    pub async fn insert_notification(
        &self,
        notification_id: Uuid,
        channel: Channel,
        recipient: &str,
        subject: Option<&str>,
        body: Option<&str>,
    ) -> Result<Notification, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_notification"])
            .start_timer();

        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (notification_id, channel, status, recipient, subject, body)
            VALUES ($1, $2, 'queued', $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification_id)
        .bind(channel.to_string())
        .bind(recipient)
        .bind(subject)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert notification: {}", e))
        })?;

        timer.observe_duration();

        Ok(notification)
    }

    /// Update a notification with the outcome of its send attempt.
    #[instrument(skip(self, error_message), fields(notification_id = %notification_id))]
    pub async fn update_notification_status(
        &self,
        notification_id: Uuid,
        status: NotificationStatus,
        provider_id: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET status = $2,
                provider_id = COALESCE($3, provider_id),
                error_message = $4,
                sent_utc = CASE WHEN $2 = 'sent' THEN NOW() ELSE sent_utc END,
                failed_utc = CASE WHEN $2 = 'failed' THEN NOW() ELSE failed_utc END
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .bind(status.to_string())
        .bind(provider_id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to update notification status: {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a notification by ID.
    #[instrument(skip(self), fields(notification_id = %notification_id))]
    pub async fn get_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, AppError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = $1"
        ))
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get notification: {}", e))
        })?;

        Ok(notification)
    }

    /// List notifications for a recipient, newest first.
    #[instrument(skip(self))]
    pub async fn list_notifications(
        &self,
        recipient: Option<&str>,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE ($1::varchar IS NULL OR recipient = $1)
            ORDER BY created_utc DESC
            "#
        ))
        .bind(recipient)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list notifications: {}", e))
        })?;

        Ok(notifications)
    }
}
