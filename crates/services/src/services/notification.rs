//! Notification records for collaborator changes. Delivery to devices happens elsewhere.

use db::models::notification::{CreateNotification, Notification, NotificationKind};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("notification not found")]
    NotFound,
}

#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
}

impl NotificationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write the same notification for each recipient on the given connection
    pub async fn notify_users(
        conn: &mut SqliteConnection,
        recipients: &[Uuid],
        artist_id: Option<Uuid>,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        for user_id in recipients {
            Notification::create(
                &mut *conn,
                &CreateNotification {
                    user_id: *user_id,
                    artist_id,
                    kind,
                    title: title.to_string(),
                    message: message.to_string(),
                },
            )
            .await?;
        }
        debug!(kind = %kind, recipients = recipients.len(), "Notifications written");
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, NotificationError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 200);
        Ok(Notification::find_by_user_id(&self.pool, user_id, limit).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, NotificationError> {
        Ok(Notification::count_unread(&self.pool, user_id).await?)
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<(), NotificationError> {
        match Notification::mark_read(&self.pool, id, user_id).await? {
            0 => Err(NotificationError::NotFound),
            _ => Ok(()),
        }
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        Ok(Notification::mark_all_read(&self.pool, user_id).await?)
    }
}
