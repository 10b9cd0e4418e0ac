use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::notification::Notification;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, TS)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize, TS)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn list_notifications(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = deployment
        .notifications()
        .list(user.id(), query.limit)
        .await?;
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

pub async fn unread_count(
    State(deployment): State<Deployment>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<UnreadCount>>, ApiError> {
    let unread = deployment.notifications().unread_count(user.id()).await?;
    Ok(ResponseJson(ApiResponse::success(UnreadCount { unread })))
}

pub async fn mark_read(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .notifications()
        .mark_read(user.id(), notification_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn mark_all_read(
    State(deployment): State<Deployment>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<MarkedRead>>, ApiError> {
    let updated = deployment.notifications().mark_all_read(user.id()).await?;
    Ok(ResponseJson(ApiResponse::success(MarkedRead { updated })))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{notification_id}/read", post(mark_read))
}
