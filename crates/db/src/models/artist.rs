use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::artist_collaborator::CollaboratorRole;

/// A performer or band profile, managed collectively by its collaborators
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An artist as seen by one of its collaborators
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ArtistWithRole {
    #[serde(flatten)]
    #[ts(flatten)]
    #[sqlx(flatten)]
    pub artist: Artist,
    pub role: CollaboratorRole,
}

impl std::ops::Deref for ArtistWithRole {
    type Target = Artist;
    fn deref(&self) -> &Self::Target {
        &self.artist
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateArtist {
    pub name: String,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateArtist {
    pub name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl Artist {
    pub async fn create<'e, E>(executor: E, id: Uuid, data: &CreateArtist) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Artist>(
            r#"INSERT INTO artists (id, name, profile_image_url, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $4)
               RETURNING id, name, profile_image_url, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.profile_image_url)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Artist>(
            r#"SELECT id, name, profile_image_url, created_at, updated_at
               FROM artists
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All artists the user collaborates on, alphabetically
    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<ArtistWithRole>, sqlx::Error> {
        sqlx::query_as::<_, ArtistWithRole>(
            r#"SELECT a.id, a.name, a.profile_image_url, a.created_at, a.updated_at, c.role
               FROM artists a
               JOIN artist_collaborators c ON c.artist_id = a.id
               WHERE c.user_id = $1
               ORDER BY a.name COLLATE NOCASE ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Fields left as `None` keep their current value
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateArtist,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Artist>(
            r#"UPDATE artists
               SET name = COALESCE($2, name),
                   profile_image_url = COALESCE($3, profile_image_url),
                   updated_at = $4
               WHERE id = $1
               RETURNING id, name, profile_image_url, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.profile_image_url)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Deletes the artist row only; dependents must already be gone
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM artists WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
