use db::{
    DBService,
    models::{
        artist::{Artist, CreateArtist},
        artist_collaborator::{ArtistCollaborator, CollaboratorRole},
        user::{CreateUser, User},
    },
};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::realtime::ChangeFeed;

pub struct TestContext {
    pub pool: SqlitePool,
    pub feed: ChangeFeed,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = DBService::new_in_memory().await.unwrap();
        Self {
            pool: db.pool,
            feed: ChangeFeed::new(64),
        }
    }

    pub async fn user(&self, email: &str) -> Uuid {
        let name = email.split('@').next().unwrap_or(email).to_string();
        User::create(
            &self.pool,
            Uuid::new_v4(),
            &CreateUser {
                email: email.to_string(),
                display_name: name,
            },
        )
        .await
        .unwrap()
        .id
    }

    /// Insert an artist with the given memberships, bypassing the service layer
    pub async fn artist(&self, members: &[(Uuid, CollaboratorRole)]) -> Uuid {
        let artist = Artist::create(
            &self.pool,
            Uuid::new_v4(),
            &CreateArtist {
                name: "The Band".to_string(),
                profile_image_url: None,
            },
        )
        .await
        .unwrap();
        for (user_id, role) in members {
            ArtistCollaborator::create(&self.pool, artist.id, *user_id, *role)
                .await
                .unwrap();
        }
        artist.id
    }
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
