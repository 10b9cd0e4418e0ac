//! Artist profiles, their collaborators, and the user's active artist.

use db::models::{
    artist::{Artist, ArtistWithRole, CreateArtist, UpdateArtist},
    artist_collaborator::{ArtistCollaborator, CollaboratorRole, CollaboratorWithUser},
    notification::NotificationKind,
    user_settings::UserSettings,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    leave_artist::{CascadeReport, delete_artist_cascade, reassign_active_artist},
    notification::NotificationService,
    permissions::{self, Capability, PermissionError},
    realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable},
};

#[derive(Debug, Error)]
pub enum ArtistError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error("artist not found")]
    NotFound,
    #[error("collaborator not found")]
    CollaboratorNotFound,
    #[error("artist name cannot be empty")]
    EmptyName,
    #[error("use leave or transfer ownership to change your own membership")]
    SelfModification,
    #[error("role {actor} cannot assign {requested} to a {current}")]
    RoleNotAssignable {
        actor: CollaboratorRole,
        current: CollaboratorRole,
        requested: CollaboratorRole,
    },
    #[error("the artist must keep at least one owner")]
    LastOwner,
}

#[derive(Clone)]
pub struct ArtistService {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ArtistService {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    /// Create an artist owned by `user_id`. Becomes the user's active artist if they had none.
    pub async fn create(
        &self,
        user_id: Uuid,
        data: &CreateArtist,
    ) -> Result<ArtistWithRole, ArtistError> {
        if data.name.trim().is_empty() {
            return Err(ArtistError::EmptyName);
        }

        let mut tx = self.pool.begin().await?;
        let artist = Artist::create(&mut *tx, Uuid::new_v4(), data).await?;
        ArtistCollaborator::create(&mut *tx, artist.id, user_id, CollaboratorRole::Owner).await?;

        let has_active = UserSettings::find_by_user_id(&mut *tx, user_id)
            .await?
            .and_then(|s| s.active_artist_id)
            .is_some();
        if !has_active {
            UserSettings::set_active_artist(&mut *tx, user_id, Some(artist.id)).await?;
        }
        tx.commit().await?;

        info!(artist_id = %artist.id, user_id = %user_id, "Artist created");
        self.feed.publish(ChangeEvent::new(
            ChangeTable::Artists,
            ChangeKind::Insert,
            artist.id,
            artist.id,
        ));

        Ok(ArtistWithRole {
            artist,
            role: CollaboratorRole::Owner,
        })
    }

    pub async fn get(&self, user_id: Uuid, artist_id: Uuid) -> Result<ArtistWithRole, ArtistError> {
        let member = permissions::membership(&self.pool, artist_id, user_id).await?;
        let artist = Artist::find_by_id(&self.pool, artist_id)
            .await?
            .ok_or(ArtistError::NotFound)?;
        Ok(ArtistWithRole {
            artist,
            role: member.role,
        })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ArtistWithRole>, ArtistError> {
        Ok(Artist::find_for_user(&self.pool, user_id).await?)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
        data: &UpdateArtist,
    ) -> Result<ArtistWithRole, ArtistError> {
        let member =
            permissions::require(&self.pool, artist_id, user_id, Capability::EditArtist).await?;
        if data.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ArtistError::EmptyName);
        }

        let artist = Artist::update(&self.pool, artist_id, data)
            .await?
            .ok_or(ArtistError::NotFound)?;
        self.feed.publish(ChangeEvent::new(
            ChangeTable::Artists,
            ChangeKind::Update,
            artist_id,
            artist_id,
        ));

        Ok(ArtistWithRole {
            artist,
            role: member.role,
        })
    }

    /// Owner-only deletion of the artist and everything attached to it
    pub async fn delete(&self, user_id: Uuid, artist_id: Uuid) -> Result<CascadeReport, ArtistError> {
        permissions::require(&self.pool, artist_id, user_id, Capability::DeleteArtist).await?;

        let mut tx = self.pool.begin().await?;
        let report = delete_artist_cascade(&mut tx, artist_id).await?;
        tx.commit().await?;

        info!(
            artist_id = %artist_id,
            user_id = %user_id,
            collaborators = report.collaborators,
            events = report.events,
            "Artist deleted"
        );
        self.feed.publish(ChangeEvent::new(
            ChangeTable::Artists,
            ChangeKind::Delete,
            artist_id,
            artist_id,
        ));
        Ok(report)
    }

    pub async fn collaborators(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
    ) -> Result<Vec<CollaboratorWithUser>, ArtistError> {
        permissions::membership(&self.pool, artist_id, user_id).await?;
        Ok(ArtistCollaborator::find_with_users(&self.pool, artist_id).await?)
    }

    /// All user ids with a membership on the artist
    pub async fn collaborator_ids(&self, artist_id: Uuid) -> Result<Vec<Uuid>, ArtistError> {
        Ok(ArtistCollaborator::find_by_artist_id(&self.pool, artist_id)
            .await?
            .into_iter()
            .map(|c| c.user_id)
            .collect())
    }

    pub async fn change_role(
        &self,
        actor_id: Uuid,
        artist_id: Uuid,
        target_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<ArtistCollaborator, ArtistError> {
        if actor_id == target_id {
            return Err(ArtistError::SelfModification);
        }
        let actor =
            permissions::require(&self.pool, artist_id, actor_id, Capability::ManageCollaborators)
                .await?;

        let mut tx = self.pool.begin().await?;
        let rows = ArtistCollaborator::find_by_artist_id(&mut *tx, artist_id).await?;
        let target = rows
            .iter()
            .find(|c| c.user_id == target_id)
            .cloned()
            .ok_or(ArtistError::CollaboratorNotFound)?;

        if !permissions::can_assign_role(actor.role, target.role, role) {
            return Err(ArtistError::RoleNotAssignable {
                actor: actor.role,
                current: target.role,
                requested: role,
            });
        }
        if target.role == CollaboratorRole::Owner
            && role != CollaboratorRole::Owner
            && owner_count(&rows) <= 1
        {
            return Err(ArtistError::LastOwner);
        }

        ArtistCollaborator::update_role(&mut *tx, artist_id, target_id, role).await?;
        NotificationService::notify_users(
            &mut tx,
            &[target_id],
            Some(artist_id),
            NotificationKind::RoleChanged,
            "Your role changed",
            &format!("You are now {role}"),
        )
        .await?;
        tx.commit().await?;

        info!(
            artist_id = %artist_id,
            target_id = %target_id,
            from = %target.role,
            to = %role,
            "Collaborator role changed"
        );
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistCollaborators,
            ChangeKind::Update,
            artist_id,
            target.id,
        ));

        Ok(ArtistCollaborator { role, ..target })
    }

    /// Remove another collaborator. Leaving yourself goes through the leave flow.
    pub async fn remove_collaborator(
        &self,
        actor_id: Uuid,
        artist_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ArtistError> {
        if actor_id == target_id {
            return Err(ArtistError::SelfModification);
        }
        let actor =
            permissions::require(&self.pool, artist_id, actor_id, Capability::ManageCollaborators)
                .await?;
        let artist = Artist::find_by_id(&self.pool, artist_id)
            .await?
            .ok_or(ArtistError::NotFound)?;

        let mut tx = self.pool.begin().await?;
        let rows = ArtistCollaborator::find_by_artist_id(&mut *tx, artist_id).await?;
        let target = rows
            .iter()
            .find(|c| c.user_id == target_id)
            .cloned()
            .ok_or(ArtistError::CollaboratorNotFound)?;

        if !permissions::can_remove(actor.role, target.role) {
            return Err(PermissionError::Forbidden {
                role: actor.role,
                capability: Capability::ManageCollaborators,
            }
            .into());
        }
        if target.role == CollaboratorRole::Owner && owner_count(&rows) <= 1 {
            return Err(ArtistError::LastOwner);
        }

        reassign_active_artist(&mut tx, target_id, artist_id).await?;
        ArtistCollaborator::delete(&mut *tx, artist_id, target_id).await?;
        NotificationService::notify_users(
            &mut tx,
            &[target_id],
            Some(artist_id),
            NotificationKind::CollaboratorRemoved,
            "Removed from artist",
            &format!("You were removed from {}", artist.name),
        )
        .await?;
        tx.commit().await?;

        info!(artist_id = %artist_id, target_id = %target_id, "Collaborator removed");
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistCollaborators,
            ChangeKind::Delete,
            artist_id,
            target.id,
        ));
        Ok(())
    }

    pub async fn active_artist(&self, user_id: Uuid) -> Result<Option<ArtistWithRole>, ArtistError> {
        let Some(artist_id) = UserSettings::find_by_user_id(&self.pool, user_id)
            .await?
            .and_then(|s| s.active_artist_id)
        else {
            return Ok(None);
        };
        match self.get(user_id, artist_id).await {
            Ok(artist) => Ok(Some(artist)),
            Err(ArtistError::Permission(PermissionError::NotACollaborator))
            | Err(ArtistError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set_active_artist(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
    ) -> Result<ArtistWithRole, ArtistError> {
        let artist = self.get(user_id, artist_id).await?;
        UserSettings::set_active_artist(&self.pool, user_id, Some(artist_id)).await?;
        Ok(artist)
    }
}

fn owner_count(rows: &[ArtistCollaborator]) -> usize {
    rows.iter()
        .filter(|c| c.role == CollaboratorRole::Owner)
        .count()
}

#[cfg(test)]
mod tests {
    use db::models::notification::Notification;

    use super::*;
    use crate::services::test_support::{TestContext, count_rows};

    use CollaboratorRole::*;

    fn band() -> CreateArtist {
        CreateArtist {
            name: "  Night Owls ".to_string(),
            profile_image_url: None,
        }
    }

    #[tokio::test]
    async fn test_creator_becomes_owner_and_active() {
        let ctx = TestContext::new().await;
        let user = ctx.user("singer@example.com").await;
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());

        let created = service.create(user, &band()).await.unwrap();
        assert_eq!(created.role, Owner);
        assert_eq!(created.name, "Night Owls");

        let active = service.active_artist(user).await.unwrap().unwrap();
        assert_eq!(active.id, created.id);

        let second = service
            .create(
                user,
                &CreateArtist {
                    name: "Side Project".to_string(),
                    profile_image_url: None,
                },
            )
            .await
            .unwrap();
        let active = service.active_artist(user).await.unwrap().unwrap();
        assert_eq!(active.id, created.id);

        let listed = service.list_for_user(user).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Night Owls", "Side Project"]);
        assert!(listed.iter().any(|a| a.id == second.id));
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let ctx = TestContext::new().await;
        let user = ctx.user("singer@example.com").await;
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());
        let result = service
            .create(
                user,
                &CreateArtist {
                    name: "   ".to_string(),
                    profile_image_url: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ArtistError::EmptyName)));
    }

    #[tokio::test]
    async fn test_update_requires_edit_capability() {
        let ctx = TestContext::new().await;
        let admin = ctx.user("admin@example.com").await;
        let editor = ctx.user("editor@example.com").await;
        let owner = ctx.user("owner@example.com").await;
        let artist_id = ctx
            .artist(&[(owner, Owner), (admin, Admin), (editor, Editor)])
            .await;
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());

        let update = UpdateArtist {
            name: Some("Renamed".to_string()),
            profile_image_url: None,
        };
        let denied = service.update(editor, artist_id, &update).await;
        assert!(matches!(
            denied,
            Err(ArtistError::Permission(PermissionError::Forbidden { .. }))
        ));

        let updated = service.update(admin, artist_id, &update).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.role, Admin);
    }

    #[tokio::test]
    async fn test_delete_is_owner_only() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let admin = ctx.user("admin@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner), (admin, Admin)]).await;
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());

        assert!(service.delete(admin, artist_id).await.is_err());
        let report = service.delete(owner, artist_id).await.unwrap();
        assert_eq!(report.collaborators, 2);
        assert_eq!(report.artists, 1);
        assert_eq!(count_rows(&ctx.pool, "artists").await, 0);
    }

    #[tokio::test]
    async fn test_change_role_guards() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let admin = ctx.user("admin@example.com").await;
        let viewer = ctx.user("viewer@example.com").await;
        let artist_id = ctx
            .artist(&[(owner, Owner), (admin, Admin), (viewer, Viewer)])
            .await;
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());

        let promoted = service
            .change_role(admin, artist_id, viewer, Editor)
            .await
            .unwrap();
        assert_eq!(promoted.role, Editor);
        assert_eq!(
            Notification::count_unread(&ctx.pool, viewer).await.unwrap(),
            1
        );

        assert!(matches!(
            service.change_role(admin, artist_id, viewer, Owner).await,
            Err(ArtistError::RoleNotAssignable { .. })
        ));
        assert!(matches!(
            service.change_role(admin, artist_id, owner, Viewer).await,
            Err(ArtistError::RoleNotAssignable { .. })
        ));
        assert!(matches!(
            service.change_role(owner, artist_id, owner, Admin).await,
            Err(ArtistError::SelfModification)
        ));

        service
            .change_role(owner, artist_id, admin, Owner)
            .await
            .unwrap();
        // Two owners now, so one may be demoted by the other
        service
            .change_role(admin, artist_id, owner, Editor)
            .await
            .unwrap();
        let rows = ArtistCollaborator::find_by_artist_id(&ctx.pool, artist_id)
            .await
            .unwrap();
        assert_eq!(owner_count(&rows), 1);
    }

    #[tokio::test]
    async fn test_remove_collaborator() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let admin = ctx.user("admin@example.com").await;
        let editor = ctx.user("editor@example.com").await;
        let artist_id = ctx
            .artist(&[(owner, Owner), (admin, Admin), (editor, Editor)])
            .await;
        UserSettings::set_active_artist(&ctx.pool, editor, Some(artist_id))
            .await
            .unwrap();
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());

        assert!(matches!(
            service.remove_collaborator(admin, artist_id, owner).await,
            Err(ArtistError::Permission(PermissionError::Forbidden { .. }))
        ));
        assert!(matches!(
            service.remove_collaborator(editor, artist_id, admin).await,
            Err(ArtistError::Permission(PermissionError::Forbidden { .. }))
        ));

        service
            .remove_collaborator(admin, artist_id, editor)
            .await
            .unwrap();
        assert!(
            ArtistCollaborator::find_membership(&ctx.pool, artist_id, editor)
                .await
                .unwrap()
                .is_none()
        );
        assert!(service.active_artist(editor).await.unwrap().is_none());
        assert_eq!(
            Notification::count_unread(&ctx.pool, editor).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_active_artist_requires_membership() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let stranger = ctx.user("stranger@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner)]).await;
        let service = ArtistService::new(ctx.pool.clone(), ctx.feed.clone());

        assert!(matches!(
            service.set_active_artist(stranger, artist_id).await,
            Err(ArtistError::Permission(PermissionError::NotACollaborator))
        ));
        let active = service.set_active_artist(owner, artist_id).await.unwrap();
        assert_eq!(active.id, artist_id);
        assert_eq!(
            service.active_artist(owner).await.unwrap().map(|a| a.id),
            Some(artist_id)
        );
    }
}
