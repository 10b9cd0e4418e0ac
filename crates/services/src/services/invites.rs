//! Inviting people onto an artist by email.

use db::models::{
    artist::Artist,
    artist_collaborator::{ArtistCollaborator, CollaboratorRole},
    artist_invite::{ArtistInvite, CreateArtistInvite, InviteStatus},
    notification::NotificationKind,
    user::User,
    user_settings::UserSettings,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    notification::NotificationService,
    permissions::{self, Capability, PermissionError},
    realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable},
};

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error("invite not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("ownership cannot be granted through an invite")]
    OwnerRoleNotInvitable,
    #[error("user is already a collaborator of this artist")]
    AlreadyMember,
    #[error("a pending invite already exists for this email")]
    AlreadyInvited,
    #[error("invite is no longer pending")]
    NotPending,
}

#[derive(Clone)]
pub struct InviteService {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl InviteService {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn invite(
        &self,
        actor_id: Uuid,
        artist_id: Uuid,
        data: &CreateArtistInvite,
    ) -> Result<ArtistInvite, InviteError> {
        permissions::require(&self.pool, artist_id, actor_id, Capability::ManageCollaborators)
            .await?;
        if data.role == CollaboratorRole::Owner {
            return Err(InviteError::OwnerRoleNotInvitable);
        }
        let email = data.email.trim();
        if !is_plausible_email(email) {
            return Err(InviteError::InvalidEmail);
        }

        let invitee = User::find_by_email(&self.pool, email).await?;
        if let Some(user) = &invitee {
            if ArtistCollaborator::find_membership(&self.pool, artist_id, user.id)
                .await?
                .is_some()
            {
                return Err(InviteError::AlreadyMember);
            }
        }
        if ArtistInvite::has_pending(&self.pool, artist_id, email).await? {
            return Err(InviteError::AlreadyInvited);
        }

        let artist_name = artist_name(&self.pool, artist_id).await?;

        let mut tx = self.pool.begin().await?;
        let invite = ArtistInvite::create(&mut *tx, artist_id, actor_id, data).await?;
        if let Some(user) = invitee {
            NotificationService::notify_users(
                &mut tx,
                &[user.id],
                Some(artist_id),
                NotificationKind::InviteReceived,
                "New invite",
                &format!("You were invited to join {artist_name} as {}", data.role),
            )
            .await?;
        }
        tx.commit().await?;

        info!(invite_id = %invite.id, artist_id = %artist_id, role = %invite.role, "Invite created");
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistInvites,
            ChangeKind::Insert,
            artist_id,
            invite.id,
        ));
        Ok(invite)
    }

    /// Pending invites addressed to the user's email
    pub async fn pending_for_user(&self, user_id: Uuid) -> Result<Vec<ArtistInvite>, InviteError> {
        let user = self.user(user_id).await?;
        Ok(ArtistInvite::find_pending_for_email(&self.pool, &user.email).await?)
    }

    pub async fn pending_for_artist(
        &self,
        actor_id: Uuid,
        artist_id: Uuid,
    ) -> Result<Vec<ArtistInvite>, InviteError> {
        permissions::require(&self.pool, artist_id, actor_id, Capability::ManageCollaborators)
            .await?;
        Ok(ArtistInvite::find_pending_for_artist(&self.pool, artist_id).await?)
    }

    /// Join the artist with the invited role
    pub async fn accept(
        &self,
        user_id: Uuid,
        invite_id: Uuid,
    ) -> Result<ArtistCollaborator, InviteError> {
        let user = self.user(user_id).await?;
        let invite = self.addressed_to(&user, invite_id).await?;
        if ArtistCollaborator::find_membership(&self.pool, invite.artist_id, user_id)
            .await?
            .is_some()
        {
            return Err(InviteError::AlreadyMember);
        }
        let artist_name = artist_name(&self.pool, invite.artist_id).await?;

        let mut tx = self.pool.begin().await?;
        let member =
            ArtistCollaborator::create(&mut *tx, invite.artist_id, user_id, invite.role).await?;
        ArtistInvite::update_status(&mut *tx, invite.id, InviteStatus::Accepted).await?;

        let has_active = UserSettings::find_by_user_id(&mut *tx, user_id)
            .await?
            .and_then(|s| s.active_artist_id)
            .is_some();
        if !has_active {
            UserSettings::set_active_artist(&mut *tx, user_id, Some(invite.artist_id)).await?;
        }

        NotificationService::notify_users(
            &mut tx,
            &[invite.invited_by],
            Some(invite.artist_id),
            NotificationKind::InviteAccepted,
            "Invite accepted",
            &format!("{} joined {artist_name}", user.display_name),
        )
        .await?;
        tx.commit().await?;

        info!(
            invite_id = %invite.id,
            artist_id = %invite.artist_id,
            user_id = %user_id,
            role = %invite.role,
            "Invite accepted"
        );
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistCollaborators,
            ChangeKind::Insert,
            invite.artist_id,
            member.id,
        ));
        Ok(member)
    }

    pub async fn decline(&self, user_id: Uuid, invite_id: Uuid) -> Result<(), InviteError> {
        let user = self.user(user_id).await?;
        let invite = self.addressed_to(&user, invite_id).await?;
        ArtistInvite::update_status(&self.pool, invite.id, InviteStatus::Declined).await?;
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistInvites,
            ChangeKind::Update,
            invite.artist_id,
            invite.id,
        ));
        Ok(())
    }

    /// Withdraw a pending invite; needs collaborator management rights on the artist
    pub async fn cancel(&self, actor_id: Uuid, invite_id: Uuid) -> Result<(), InviteError> {
        let invite = ArtistInvite::find_by_id(&self.pool, invite_id)
            .await?
            .ok_or(InviteError::NotFound)?;
        permissions::require(
            &self.pool,
            invite.artist_id,
            actor_id,
            Capability::ManageCollaborators,
        )
        .await?;
        if invite.status != InviteStatus::Pending {
            return Err(InviteError::NotPending);
        }
        ArtistInvite::update_status(&self.pool, invite.id, InviteStatus::Cancelled).await?;
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistInvites,
            ChangeKind::Update,
            invite.artist_id,
            invite.id,
        ));
        Ok(())
    }

    async fn user(&self, user_id: Uuid) -> Result<User, InviteError> {
        User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(InviteError::UserNotFound)
    }

    /// The pending invite, if it is addressed to `user`. Other people's invites read as missing.
    async fn addressed_to(&self, user: &User, invite_id: Uuid) -> Result<ArtistInvite, InviteError> {
        let invite = ArtistInvite::find_by_id(&self.pool, invite_id)
            .await?
            .filter(|i| i.invitee_email.eq_ignore_ascii_case(user.email.trim()))
            .ok_or(InviteError::NotFound)?;
        if invite.status != InviteStatus::Pending {
            return Err(InviteError::NotPending);
        }
        Ok(invite)
    }
}

async fn artist_name(pool: &SqlitePool, artist_id: Uuid) -> Result<String, sqlx::Error> {
    Ok(Artist::find_by_id(pool, artist_id)
        .await?
        .map(|a| a.name)
        .unwrap_or_else(|| "an artist".to_string()))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
