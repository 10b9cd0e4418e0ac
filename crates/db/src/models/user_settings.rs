use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;
use uuid::Uuid;

/// Per-user session context; currently just the active artist
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub active_artist_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub async fn find_by_user_id<'e, E>(executor: E, user_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, UserSettings>(
            "SELECT user_id, active_artist_id, updated_at FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_active_artist<'e, E>(
        executor: E,
        user_id: Uuid,
        active_artist_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, UserSettings>(
            r#"INSERT INTO user_settings (user_id, active_artist_id, updated_at)
               VALUES ($1, $2, $3)
               ON CONFLICT(user_id) DO UPDATE SET
                   active_artist_id = excluded.active_artist_id,
                   updated_at = excluded.updated_at
               RETURNING user_id, active_artist_id, updated_at"#,
        )
        .bind(user_id)
        .bind(active_artist_id)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }
}
