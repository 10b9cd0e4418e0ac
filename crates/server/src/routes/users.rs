use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, User};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct RegisterUser {
    /// Id assigned by the identity provider; generated when absent
    pub id: Option<Uuid>,
    pub email: String,
    pub display_name: String,
}

/// Register the profile for a newly authenticated user
pub async fn register_user(
    State(deployment): State<Deployment>,
    Json(payload): Json<RegisterUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let pool = &deployment.db().pool;
    let email = payload.email.trim();
    if !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }
    if payload.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest("display name is required".to_string()));
    }
    if User::find_by_email(pool, email).await?.is_some() {
        return Err(ApiError::Conflict("email is already registered".to_string()));
    }

    let user = User::create(
        pool,
        payload.id.unwrap_or_else(Uuid::new_v4),
        &CreateUser {
            email: email.to_string(),
            display_name: payload.display_name.trim().to_string(),
        },
    )
    .await?;
    info!(user_id = %user.id, "User registered");
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn get_current_user(user: CurrentUser) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(user.0))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/me", get(get_current_user))
}
