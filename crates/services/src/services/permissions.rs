//! Static role → capability gate consulted before every artist-scoped action.

use db::models::artist_collaborator::{ArtistCollaborator, CollaboratorRole};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::Display;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ViewEvents,
    CreateEvents,
    DeleteEvents,
    ViewFinancials,
    EditArtist,
    ManageCollaborators,
    DeleteArtist,
    TransferOwnership,
}

const OWNER: &[Capability] = &[
    Capability::ViewEvents,
    Capability::CreateEvents,
    Capability::DeleteEvents,
    Capability::ViewFinancials,
    Capability::EditArtist,
    Capability::ManageCollaborators,
    Capability::DeleteArtist,
    Capability::TransferOwnership,
];

const ADMIN: &[Capability] = &[
    Capability::ViewEvents,
    Capability::CreateEvents,
    Capability::DeleteEvents,
    Capability::ViewFinancials,
    Capability::EditArtist,
    Capability::ManageCollaborators,
];

const EDITOR: &[Capability] = &[
    Capability::ViewEvents,
    Capability::CreateEvents,
    Capability::DeleteEvents,
    Capability::ViewFinancials,
];

const VIEWER: &[Capability] = &[Capability::ViewEvents];

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user is not a collaborator of this artist")]
    NotACollaborator,
    #[error("role {role} is not allowed to {capability}")]
    Forbidden {
        role: CollaboratorRole,
        capability: Capability,
    },
}

pub fn capabilities(role: CollaboratorRole) -> &'static [Capability] {
    match role {
        CollaboratorRole::Owner => OWNER,
        CollaboratorRole::Admin => ADMIN,
        CollaboratorRole::Editor => EDITOR,
        CollaboratorRole::Viewer => VIEWER,
    }
}

pub fn can(role: CollaboratorRole, capability: Capability) -> bool {
    capabilities(role).contains(&capability)
}

/// Whether `actor` may move a collaborator from `current` to `requested`.
/// Only owners touch the owner role; everyone else manages strictly lower tiers.
pub fn can_assign_role(
    actor: CollaboratorRole,
    current: CollaboratorRole,
    requested: CollaboratorRole,
) -> bool {
    if !can(actor, Capability::ManageCollaborators) {
        return false;
    }
    if actor == CollaboratorRole::Owner {
        return true;
    }
    actor.outranks(current) && actor.outranks(requested)
}

/// Whether `actor` may remove a collaborator holding `target`
pub fn can_remove(actor: CollaboratorRole, target: CollaboratorRole) -> bool {
    can(actor, Capability::ManageCollaborators)
        && (actor == CollaboratorRole::Owner || actor.outranks(target))
}

/// Load the user's membership on the artist, failing when there is none
pub async fn membership(
    pool: &SqlitePool,
    artist_id: Uuid,
    user_id: Uuid,
) -> Result<ArtistCollaborator, PermissionError> {
    ArtistCollaborator::find_membership(pool, artist_id, user_id)
        .await?
        .ok_or(PermissionError::NotACollaborator)
}

/// Load the membership and check it grants `capability`
pub async fn require(
    pool: &SqlitePool,
    artist_id: Uuid,
    user_id: Uuid,
    capability: Capability,
) -> Result<ArtistCollaborator, PermissionError> {
    let member = membership(pool, artist_id, user_id).await?;
    if !can(member.role, capability) {
        return Err(PermissionError::Forbidden {
            role: member.role,
            capability,
        });
    }
    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;

    use CollaboratorRole::*;

    #[test]
    fn test_viewer_is_only_role_without_financials_or_creation() {
        for role in [Owner, Admin, Editor] {
            assert!(can(role, Capability::ViewFinancials), "{role}");
            assert!(can(role, Capability::CreateEvents), "{role}");
        }
        assert!(!can(Viewer, Capability::ViewFinancials));
        assert!(!can(Viewer, Capability::CreateEvents));
        assert!(can(Viewer, Capability::ViewEvents));
    }

    #[test]
    fn test_artist_management_tiers() {
        assert!(can(Owner, Capability::EditArtist));
        assert!(can(Admin, Capability::EditArtist));
        assert!(!can(Editor, Capability::EditArtist));
        assert!(can(Admin, Capability::ManageCollaborators));
        assert!(!can(Editor, Capability::ManageCollaborators));
        assert!(can(Owner, Capability::DeleteArtist));
        assert!(!can(Admin, Capability::DeleteArtist));
        assert!(!can(Admin, Capability::TransferOwnership));
    }

    #[test]
    fn test_role_assignment_rules() {
        assert!(can_assign_role(Owner, Viewer, Owner));
        assert!(can_assign_role(Owner, Owner, Admin));
        assert!(can_assign_role(Admin, Viewer, Editor));
        assert!(!can_assign_role(Admin, Viewer, Owner));
        assert!(!can_assign_role(Admin, Admin, Editor));
        assert!(!can_assign_role(Admin, Owner, Viewer));
        assert!(!can_assign_role(Editor, Viewer, Editor));
    }

    #[test]
    fn test_removal_rules() {
        assert!(can_remove(Owner, Owner));
        assert!(can_remove(Admin, Editor));
        assert!(!can_remove(Admin, Admin));
        assert!(!can_remove(Editor, Viewer));
    }
}
