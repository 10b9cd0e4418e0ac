//! Deciding and carrying out what happens when a collaborator leaves an artist.
//!
//! An artist always keeps at least one owner or is deleted: the last collaborator
//! leaving removes the artist with everything hanging off it, and a sole owner has to
//! hand ownership over before leaving. All writes run in one transaction.

use db::models::{
    artist::Artist,
    artist_collaborator::{ArtistCollaborator, CollaboratorRole},
    artist_invite::ArtistInvite,
    event::Event,
    event_expense::EventExpense,
    notification::{Notification, NotificationKind},
    user::User,
    user_settings::UserSettings,
};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use strum_macros::Display;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    notification::NotificationService,
    permissions::{self, Capability},
    realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable},
};

#[derive(Debug, Error)]
pub enum LeaveArtistError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("artist not found")]
    ArtistNotFound,
    #[error("user is not a collaborator of this artist")]
    NotACollaborator,
    #[error("ownership must be transferred before leaving")]
    OwnershipTransferRequired(Box<LeaveAssessment>),
    #[error("only an owner can transfer ownership")]
    NotOwner,
    #[error("new owner must be another collaborator of this artist")]
    InvalidNewOwner,
}

/// What leaving an artist will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveAction {
    /// The user is the last collaborator; the artist goes with them
    DeleteArtist,
    /// The user is the only owner among several collaborators
    TransferOwnership,
    /// Only the membership row is removed
    LeaveNormally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct LeaveAssessment {
    pub action: LeaveAction,
    pub user_role: CollaboratorRole,
    pub total_collaborators: usize,
    pub total_owners: usize,
    pub title: String,
    pub message: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LeaveOutcome {
    pub action: LeaveAction,
    pub artist_id: Uuid,
    pub artist_deleted: bool,
    /// The user's active artist after leaving
    pub active_artist_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TransferOwnershipRequest {
    pub new_owner_id: Uuid,
    /// Leave the artist once ownership is handed over; otherwise stay on as admin
    #[serde(default)]
    pub leave: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TransferOutcome {
    pub artist_id: Uuid,
    pub new_owner_id: Uuid,
    pub left: bool,
    pub active_artist_id: Option<Uuid>,
}

/// Rows removed by a cascaded artist deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct CascadeReport {
    pub expenses: u64,
    pub events: u64,
    pub invites: u64,
    pub collaborators: u64,
    pub notifications: u64,
    pub artists: u64,
}

/// Decide what leaving means for `user_id` given every collaborator row of the artist
pub fn assess_leave(
    user_id: Uuid,
    collaborators: &[ArtistCollaborator],
) -> Result<LeaveAssessment, LeaveArtistError> {
    let user_role = collaborators
        .iter()
        .find(|c| c.user_id == user_id)
        .map(|c| c.role)
        .ok_or(LeaveArtistError::NotACollaborator)?;

    let total_collaborators = collaborators.len();
    let total_owners = collaborators
        .iter()
        .filter(|c| c.role == CollaboratorRole::Owner)
        .count();

    let action = if total_collaborators == 1 {
        LeaveAction::DeleteArtist
    } else if user_role == CollaboratorRole::Owner && total_owners == 1 {
        LeaveAction::TransferOwnership
    } else {
        LeaveAction::LeaveNormally
    };

    let (title, message, warnings) = match action {
        LeaveAction::DeleteArtist => (
            "Delete artist",
            "You are the last collaborator. Leaving will permanently delete this artist.".to_string(),
            vec![
                "All events will be deleted".to_string(),
                "All event expenses will be deleted".to_string(),
                "Pending invites will be cancelled".to_string(),
                "This cannot be undone".to_string(),
            ],
        ),
        LeaveAction::TransferOwnership => (
            "Transfer ownership",
            format!(
                "You are the only owner among {total_collaborators} collaborators. \
                 Choose a new owner before leaving."
            ),
            vec!["The new owner will have full control over the artist".to_string()],
        ),
        LeaveAction::LeaveNormally => {
            let mut warnings = vec!["You will lose access to this artist's events".to_string()];
            if user_role == CollaboratorRole::Owner {
                warnings.push(format!(
                    "{} other owner(s) keep full control",
                    total_owners.saturating_sub(1)
                ));
            }
            (
                "Leave artist",
                "You will be removed from this artist. Other collaborators keep their access."
                    .to_string(),
                warnings,
            )
        }
    };

    Ok(LeaveAssessment {
        action,
        user_role,
        total_collaborators,
        total_owners,
        title: title.to_string(),
        message,
        warnings,
    })
}

/// Delete the artist and its dependents in order:
/// expenses, events, invites, memberships, notifications, artist row
pub async fn delete_artist_cascade(
    conn: &mut SqliteConnection,
    artist_id: Uuid,
) -> Result<CascadeReport, sqlx::Error> {
    let expenses = EventExpense::delete_by_artist_id(&mut *conn, artist_id).await?;
    let events = Event::delete_by_artist_id(&mut *conn, artist_id).await?;
    let invites = ArtistInvite::delete_by_artist_id(&mut *conn, artist_id).await?;
    let collaborators = ArtistCollaborator::delete_by_artist_id(&mut *conn, artist_id).await?;
    let notifications = Notification::delete_by_artist_id(&mut *conn, artist_id).await?;
    let artists = Artist::delete(&mut *conn, artist_id).await?;

    Ok(CascadeReport {
        expenses,
        events,
        invites,
        collaborators,
        notifications,
        artists,
    })
}

/// Move the user's active artist off `left_artist_id`, onto their oldest remaining
/// membership if any. Must run before the membership is removed. Returns the active artist.
pub async fn reassign_active_artist(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    left_artist_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    let current = UserSettings::find_by_user_id(&mut *conn, user_id)
        .await?
        .and_then(|s| s.active_artist_id);
    if current != Some(left_artist_id) {
        return Ok(current);
    }

    let next = ArtistCollaborator::find_artist_ids_for_user(&mut *conn, user_id)
        .await?
        .into_iter()
        .find(|id| *id != left_artist_id);
    UserSettings::set_active_artist(&mut *conn, user_id, next).await?;
    Ok(next)
}

#[derive(Clone)]
pub struct LeaveArtistService {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl LeaveArtistService {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    /// Preview what leaving would do, without changing anything
    pub async fn assess(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
    ) -> Result<LeaveAssessment, LeaveArtistError> {
        let collaborators = ArtistCollaborator::find_by_artist_id(&self.pool, artist_id).await?;
        if collaborators.is_empty() {
            return Err(LeaveArtistError::ArtistNotFound);
        }
        assess_leave(user_id, &collaborators)
    }

    pub async fn leave(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
    ) -> Result<LeaveOutcome, LeaveArtistError> {
        let artist = Artist::find_by_id(&self.pool, artist_id)
            .await?
            .ok_or(LeaveArtistError::ArtistNotFound)?;
        let leaver_name = display_name(&self.pool, user_id).await?;

        let mut tx = self.pool.begin().await?;
        let collaborators = ArtistCollaborator::find_by_artist_id(&mut *tx, artist_id).await?;
        let assessment = assess_leave(user_id, &collaborators)?;

        if assessment.action == LeaveAction::TransferOwnership {
            warn!(
                user_id = %user_id,
                artist_id = %artist_id,
                "Sole owner tried to leave without transferring ownership"
            );
            return Err(LeaveArtistError::OwnershipTransferRequired(Box::new(
                assessment,
            )));
        }

        let active_artist_id = reassign_active_artist(&mut tx, user_id, artist_id).await?;

        let outcome = match assessment.action {
            LeaveAction::DeleteArtist => {
                let report = delete_artist_cascade(&mut tx, artist_id).await?;
                tx.commit().await?;

                info!(
                    user_id = %user_id,
                    artist_id = %artist_id,
                    events = report.events,
                    expenses = report.expenses,
                    invites = report.invites,
                    "Last collaborator left, artist deleted"
                );
                self.feed.publish(ChangeEvent::new(
                    ChangeTable::Artists,
                    ChangeKind::Delete,
                    artist_id,
                    artist_id,
                ));

                LeaveOutcome {
                    action: LeaveAction::DeleteArtist,
                    artist_id,
                    artist_deleted: true,
                    active_artist_id,
                }
            }
            _ => {
                ArtistCollaborator::delete(&mut *tx, artist_id, user_id).await?;

                let remaining: Vec<Uuid> = collaborators
                    .iter()
                    .map(|c| c.user_id)
                    .filter(|id| *id != user_id)
                    .collect();
                NotificationService::notify_users(
                    &mut tx,
                    &remaining,
                    Some(artist_id),
                    NotificationKind::CollaboratorLeft,
                    "Collaborator left",
                    &format!("{leaver_name} left {}", artist.name),
                )
                .await?;
                tx.commit().await?;

                info!(
                    user_id = %user_id,
                    artist_id = %artist_id,
                    role = %assessment.user_role,
                    "Collaborator left artist"
                );
                if let Some(row) = collaborators.iter().find(|c| c.user_id == user_id) {
                    self.feed.publish(ChangeEvent::new(
                        ChangeTable::ArtistCollaborators,
                        ChangeKind::Delete,
                        artist_id,
                        row.id,
                    ));
                }

                LeaveOutcome {
                    action: LeaveAction::LeaveNormally,
                    artist_id,
                    artist_deleted: false,
                    active_artist_id,
                }
            }
        };

        Ok(outcome)
    }

    /// Hand ownership to another collaborator, then leave or step down to admin
    pub async fn transfer_ownership(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
        request: &TransferOwnershipRequest,
    ) -> Result<TransferOutcome, LeaveArtistError> {
        let artist = Artist::find_by_id(&self.pool, artist_id)
            .await?
            .ok_or(LeaveArtistError::ArtistNotFound)?;
        let owner_name = display_name(&self.pool, user_id).await?;

        let mut tx = self.pool.begin().await?;
        let collaborators = ArtistCollaborator::find_by_artist_id(&mut *tx, artist_id).await?;

        let acting = collaborators
            .iter()
            .find(|c| c.user_id == user_id)
            .ok_or(LeaveArtistError::NotACollaborator)?;
        if !permissions::can(acting.role, Capability::TransferOwnership) {
            return Err(LeaveArtistError::NotOwner);
        }
        let new_owner = collaborators
            .iter()
            .find(|c| c.user_id == request.new_owner_id && c.user_id != user_id)
            .ok_or(LeaveArtistError::InvalidNewOwner)?;

        ArtistCollaborator::update_role(
            &mut *tx,
            artist_id,
            new_owner.user_id,
            CollaboratorRole::Owner,
        )
        .await?;

        let active_artist_id = if request.leave {
            let active = reassign_active_artist(&mut tx, user_id, artist_id).await?;
            ArtistCollaborator::delete(&mut *tx, artist_id, user_id).await?;
            active
        } else {
            ArtistCollaborator::update_role(&mut *tx, artist_id, user_id, CollaboratorRole::Admin)
                .await?;
            UserSettings::find_by_user_id(&mut *tx, user_id)
                .await?
                .and_then(|s| s.active_artist_id)
        };

        NotificationService::notify_users(
            &mut tx,
            &[new_owner.user_id],
            Some(artist_id),
            NotificationKind::OwnershipTransferred,
            "You are now an owner",
            &format!("{owner_name} made you owner of {}", artist.name),
        )
        .await?;

        if request.leave {
            let others: Vec<Uuid> = collaborators
                .iter()
                .map(|c| c.user_id)
                .filter(|id| *id != user_id && *id != new_owner.user_id)
                .collect();
            NotificationService::notify_users(
                &mut tx,
                &others,
                Some(artist_id),
                NotificationKind::CollaboratorLeft,
                "Collaborator left",
                &format!("{owner_name} left {}", artist.name),
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            user_id = %user_id,
            artist_id = %artist_id,
            new_owner_id = %new_owner.user_id,
            left = request.leave,
            "Ownership transferred"
        );
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistCollaborators,
            ChangeKind::Update,
            artist_id,
            new_owner.id,
        ));
        self.feed.publish(ChangeEvent::new(
            ChangeTable::ArtistCollaborators,
            if request.leave {
                ChangeKind::Delete
            } else {
                ChangeKind::Update
            },
            artist_id,
            acting.id,
        ));

        Ok(TransferOutcome {
            artist_id,
            new_owner_id: new_owner.user_id,
            left: request.leave,
            active_artist_id,
        })
    }
}

async fn display_name(pool: &SqlitePool, user_id: Uuid) -> Result<String, sqlx::Error> {
    Ok(User::find_by_id(pool, user_id)
        .await?
        .map(|u| u.display_name)
        .unwrap_or_else(|| "A collaborator".to_string()))
}
