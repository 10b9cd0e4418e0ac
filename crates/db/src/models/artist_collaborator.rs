use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Permission tier of a collaborator on an artist, highest first
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "collaborator_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CollaboratorRole {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl CollaboratorRole {
    /// Higher rank means more privileges
    pub fn rank(self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::Editor => 1,
            Self::Viewer => 0,
        }
    }

    pub fn outranks(self, other: Self) -> bool {
        self.rank() > other.rank()
    }
}

/// Membership of a user on an artist; unique per (user, artist)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ArtistCollaborator {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub user_id: Uuid,
    pub role: CollaboratorRole,
    pub created_at: DateTime<Utc>,
}

/// Collaborator row joined with the user's profile, for member lists
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CollaboratorWithUser {
    #[serde(flatten)]
    #[ts(flatten)]
    #[sqlx(flatten)]
    pub collaborator: ArtistCollaborator,
    pub email: String,
    pub display_name: String,
}

impl ArtistCollaborator {
    pub async fn create<'e, E>(
        executor: E,
        artist_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ArtistCollaborator>(
            r#"INSERT INTO artist_collaborators (id, artist_id, user_id, role, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, artist_id, user_id, role, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(artist_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_artist_id<'e, E>(
        executor: E,
        artist_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ArtistCollaborator>(
            r#"SELECT id, artist_id, user_id, role, created_at
               FROM artist_collaborators
               WHERE artist_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(artist_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_with_users(
        pool: &SqlitePool,
        artist_id: Uuid,
    ) -> Result<Vec<CollaboratorWithUser>, sqlx::Error> {
        sqlx::query_as::<_, CollaboratorWithUser>(
            r#"SELECT c.id, c.artist_id, c.user_id, c.role, c.created_at, u.email, u.display_name
               FROM artist_collaborators c
               JOIN users u ON u.id = c.user_id
               WHERE c.artist_id = $1
               ORDER BY c.created_at ASC"#,
        )
        .bind(artist_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_membership(
        pool: &SqlitePool,
        artist_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ArtistCollaborator>(
            r#"SELECT id, artist_id, user_id, role, created_at
               FROM artist_collaborators
               WHERE artist_id = $1 AND user_id = $2"#,
        )
        .bind(artist_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Artists the user belongs to, oldest membership first
    pub async fn find_artist_ids_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"SELECT artist_id
               FROM artist_collaborators
               WHERE user_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    pub async fn update_role<'e, E>(
        executor: E,
        artist_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE artist_collaborators SET role = $3 WHERE artist_id = $1 AND user_id = $2",
        )
        .bind(artist_id)
        .bind(user_id)
        .bind(role)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, artist_id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("DELETE FROM artist_collaborators WHERE artist_id = $1 AND user_id = $2")
                .bind(artist_id)
                .bind(user_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_artist_id<'e, E>(executor: E, artist_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM artist_collaborators WHERE artist_id = $1")
            .bind(artist_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(CollaboratorRole::Owner.outranks(CollaboratorRole::Admin));
        assert!(CollaboratorRole::Admin.outranks(CollaboratorRole::Editor));
        assert!(CollaboratorRole::Editor.outranks(CollaboratorRole::Viewer));
        assert!(!CollaboratorRole::Viewer.outranks(CollaboratorRole::Viewer));
    }

    #[test]
    fn test_role_string_round_trip() {
        assert_eq!(CollaboratorRole::Owner.to_string(), "owner");
        assert_eq!(
            "editor".parse::<CollaboratorRole>().unwrap(),
            CollaboratorRole::Editor
        );
        assert!("manager".parse::<CollaboratorRole>().is_err());
    }
}
