//! Request identity. Authentication itself lives in front of this service; requests
//! arrive with the caller's user id in a header.

use axum::{extract::FromRequestParts, http::request::Parts};
use db::models::user::User;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

pub const USER_ID_HEADER: &str = "x-user-id";

/// The calling user, resolved from the `x-user-id` header
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

impl FromRequestParts<Deployment> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &Deployment,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(ApiError::Unauthorized)?;

        User::find_by_id(&deployment.db().pool, user_id)
            .await?
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}
