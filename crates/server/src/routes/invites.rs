use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::{
    artist_collaborator::ArtistCollaborator,
    artist_invite::{ArtistInvite, CreateArtistInvite},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::artists::invalidate_artist_lists;
use crate::{Deployment, auth::CurrentUser, error::ApiError};

pub async fn list_artist_invites(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ArtistInvite>>>, ApiError> {
    let invites = deployment
        .invites()
        .pending_for_artist(user.id(), artist_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(invites)))
}

pub async fn create_invite(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Json(payload): Json<CreateArtistInvite>,
) -> Result<ResponseJson<ApiResponse<ArtistInvite>>, ApiError> {
    let invite = deployment
        .invites()
        .invite(user.id(), artist_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// Pending invites addressed to the caller
pub async fn list_my_invites(
    State(deployment): State<Deployment>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<Vec<ArtistInvite>>>, ApiError> {
    let invites = deployment.invites().pending_for_user(user.id()).await?;
    Ok(ResponseJson(ApiResponse::success(invites)))
}

pub async fn accept_invite(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(invite_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ArtistCollaborator>>, ApiError> {
    let membership = deployment.invites().accept(user.id(), invite_id).await?;
    invalidate_artist_lists(&deployment, &[user.id()]).await;
    Ok(ResponseJson(ApiResponse::success(membership)))
}

pub async fn decline_invite(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(invite_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.invites().decline(user.id(), invite_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn cancel_invite(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(invite_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.invites().cancel(user.id(), invite_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route(
            "/artists/{artist_id}/invites",
            get(list_artist_invites).post(create_invite),
        )
        .route("/invites", get(list_my_invites))
        .route("/invites/{invite_id}", delete(cancel_invite))
        .route("/invites/{invite_id}/accept", post(accept_invite))
        .route("/invites/{invite_id}/decline", post(decline_invite))
}
