use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::artist::{ArtistWithRole, CreateArtist, UpdateArtist};
use serde::Deserialize;
use services::services::{
    cache::{ARTISTS_KEY_PREFIX, artists_key},
    leave_artist::CascadeReport,
};
use tracing::warn;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct SetActiveArtist {
    pub artist_id: Uuid,
}

/// Drop the cached artist lists of everyone whose memberships just changed
pub async fn invalidate_artist_lists(deployment: &Deployment, user_ids: &[Uuid]) {
    for user_id in user_ids {
        deployment.cache().invalidate(&artists_key(*user_id)).await;
    }
}

pub async fn list_artists(
    State(deployment): State<Deployment>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<Vec<ArtistWithRole>>>, ApiError> {
    let key = artists_key(user.id());
    if let Some(artists) = deployment.cache().get::<Vec<ArtistWithRole>>(&key).await {
        return Ok(ResponseJson(ApiResponse::success(artists)));
    }

    let artists = deployment.artists().list_for_user(user.id()).await?;
    if let Err(e) = deployment.cache().set(&key, &artists).await {
        warn!(error = %e, "Failed to cache artist list");
    }
    Ok(ResponseJson(ApiResponse::success(artists)))
}

pub async fn create_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Json(payload): Json<CreateArtist>,
) -> Result<ResponseJson<ApiResponse<ArtistWithRole>>, ApiError> {
    let artist = deployment.artists().create(user.id(), &payload).await?;
    invalidate_artist_lists(&deployment, &[user.id()]).await;
    Ok(ResponseJson(ApiResponse::success(artist)))
}

pub async fn get_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ArtistWithRole>>, ApiError> {
    let artist = deployment.artists().get(user.id(), artist_id).await?;
    Ok(ResponseJson(ApiResponse::success(artist)))
}

pub async fn update_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Json(payload): Json<UpdateArtist>,
) -> Result<ResponseJson<ApiResponse<ArtistWithRole>>, ApiError> {
    let service = deployment.artists();
    let artist = service.update(user.id(), artist_id, &payload).await?;
    let members = service.collaborator_ids(artist_id).await?;
    invalidate_artist_lists(&deployment, &members).await;
    Ok(ResponseJson(ApiResponse::success(artist)))
}

pub async fn delete_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CascadeReport>>, ApiError> {
    let report = deployment.artists().delete(user.id(), artist_id).await?;
    deployment.cache().invalidate_prefix(ARTISTS_KEY_PREFIX).await;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn get_active_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<Option<ArtistWithRole>>>, ApiError> {
    let artist = deployment.artists().active_artist(user.id()).await?;
    Ok(ResponseJson(ApiResponse::success(artist)))
}

pub async fn set_active_artist(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Json(payload): Json<SetActiveArtist>,
) -> Result<ResponseJson<ApiResponse<ArtistWithRole>>, ApiError> {
    let artist = deployment
        .artists()
        .set_active_artist(user.id(), payload.artist_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(artist)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/artists", get(list_artists).post(create_artist))
        .route(
            "/artists/{artist_id}",
            get(get_artist).put(update_artist).delete(delete_artist),
        )
        .route(
            "/active-artist",
            get(get_active_artist).put(set_active_artist),
        )
}
