use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::artist_collaborator::CollaboratorRole;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "invite_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

/// Invitation for someone to join an artist with a given role
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ArtistInvite {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub invited_by: Uuid,
    pub invitee_email: String,
    pub role: CollaboratorRole,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateArtistInvite {
    pub email: String,
    pub role: CollaboratorRole,
}

const INVITE_COLUMNS: &str =
    "id, artist_id, invited_by, invitee_email, role, status, created_at, updated_at";

impl ArtistInvite {
    pub async fn create<'e, E>(
        executor: E,
        artist_id: Uuid,
        invited_by: Uuid,
        data: &CreateArtistInvite,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, ArtistInvite>(&format!(
            r#"INSERT INTO artist_invites (id, artist_id, invited_by, invitee_email, role, status,
                                           created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
               RETURNING {INVITE_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(artist_id)
        .bind(invited_by)
        .bind(data.email.trim())
        .bind(data.role)
        .bind(InviteStatus::Pending)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ArtistInvite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM artist_invites WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_pending_for_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ArtistInvite>(&format!(
            r#"SELECT {INVITE_COLUMNS}
               FROM artist_invites
               WHERE invitee_email = $1 AND status = 'pending'
               ORDER BY created_at DESC"#
        ))
        .bind(email.trim())
        .fetch_all(pool)
        .await
    }

    pub async fn find_pending_for_artist(
        pool: &SqlitePool,
        artist_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ArtistInvite>(&format!(
            r#"SELECT {INVITE_COLUMNS}
               FROM artist_invites
               WHERE artist_id = $1 AND status = 'pending'
               ORDER BY created_at DESC"#
        ))
        .bind(artist_id)
        .fetch_all(pool)
        .await
    }

    pub async fn has_pending(
        pool: &SqlitePool,
        artist_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM artist_invites
               WHERE artist_id = $1 AND invitee_email = $2 AND status = 'pending'"#,
        )
        .bind(artist_id)
        .bind(email.trim())
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: InviteStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE artist_invites SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(status)
                .bind(Utc::now())
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_artist_id<'e, E>(executor: E, artist_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM artist_invites WHERE artist_id = $1")
            .bind(artist_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
