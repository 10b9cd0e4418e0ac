//! Membership management on an artist, including the leave and ownership transfer flow.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::artist_collaborator::{ArtistCollaborator, CollaboratorRole, CollaboratorWithUser};
use serde::Deserialize;
use services::services::{
    cache::ARTISTS_KEY_PREFIX,
    leave_artist::{LeaveAssessment, LeaveOutcome, TransferOutcome, TransferOwnershipRequest},
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::artists::invalidate_artist_lists;
use crate::{Deployment, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ChangeRole {
    pub role: CollaboratorRole,
}

pub async fn list_collaborators(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<CollaboratorWithUser>>>, ApiError> {
    let collaborators = deployment
        .artists()
        .collaborators(user.id(), artist_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(collaborators)))
}

pub async fn change_role(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path((artist_id, target_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ChangeRole>,
) -> Result<ResponseJson<ApiResponse<ArtistCollaborator>>, ApiError> {
    let collaborator = deployment
        .artists()
        .change_role(user.id(), artist_id, target_id, payload.role)
        .await?;
    invalidate_artist_lists(&deployment, &[target_id]).await;
    Ok(ResponseJson(ApiResponse::success(collaborator)))
}

pub async fn remove_collaborator(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path((artist_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .artists()
        .remove_collaborator(user.id(), artist_id, target_id)
        .await?;
    invalidate_artist_lists(&deployment, &[target_id]).await;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Preview what leaving would do for the caller
pub async fn assess_leave(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<LeaveAssessment>>, ApiError> {
    let assessment = deployment.leave_artist().assess(user.id(), artist_id).await?;
    Ok(ResponseJson(ApiResponse::success(assessment)))
}

/// Leave the artist. A sole owner among several collaborators gets 409 with the assessment.
pub async fn leave_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<LeaveOutcome>>, ApiError> {
    let outcome = deployment.leave_artist().leave(user.id(), artist_id).await?;
    if outcome.artist_deleted {
        deployment.cache().invalidate_prefix(ARTISTS_KEY_PREFIX).await;
    } else {
        invalidate_artist_lists(&deployment, &[user.id()]).await;
    }
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub async fn transfer_ownership(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Json(payload): Json<TransferOwnershipRequest>,
) -> Result<ResponseJson<ApiResponse<TransferOutcome>>, ApiError> {
    let members = deployment.artists().collaborator_ids(artist_id).await?;
    let outcome = deployment
        .leave_artist()
        .transfer_ownership(user.id(), artist_id, &payload)
        .await?;
    invalidate_artist_lists(&deployment, &members).await;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/artists/{artist_id}/collaborators", get(list_collaborators))
        .route(
            "/artists/{artist_id}/collaborators/{user_id}",
            put(change_role).delete(remove_collaborator),
        )
        .route(
            "/artists/{artist_id}/leave",
            get(assess_leave).post(leave_artist),
        )
        .route(
            "/artists/{artist_id}/transfer-ownership",
            post(transfer_ownership),
        )
}
