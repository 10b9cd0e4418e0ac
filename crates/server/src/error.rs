use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    artists::ArtistError, calendar::CalendarError, currency::CurrencyError, events::EventError,
    invites::InviteError, leave_artist::LeaveArtistError, notification::NotificationError,
    permissions::PermissionError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Artist(#[from] ArtistError),
    #[error(transparent)]
    LeaveArtist(#[from] LeaveArtistError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("missing or unknown x-user-id header")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
}

fn permission_status(err: &PermissionError) -> StatusCode {
    match err {
        PermissionError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PermissionError::NotACollaborator => StatusCode::NOT_FOUND,
        PermissionError::Forbidden { .. } => StatusCode::FORBIDDEN,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Artist(err) => match err {
                ArtistError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ArtistError::Permission(p) => permission_status(p),
                ArtistError::NotFound | ArtistError::CollaboratorNotFound => StatusCode::NOT_FOUND,
                ArtistError::EmptyName | ArtistError::SelfModification => StatusCode::BAD_REQUEST,
                ArtistError::RoleNotAssignable { .. } => StatusCode::FORBIDDEN,
                ArtistError::LastOwner => StatusCode::CONFLICT,
            },
            ApiError::LeaveArtist(err) => match err {
                LeaveArtistError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                LeaveArtistError::ArtistNotFound | LeaveArtistError::NotACollaborator => {
                    StatusCode::NOT_FOUND
                }
                LeaveArtistError::OwnershipTransferRequired(_) => StatusCode::CONFLICT,
                LeaveArtistError::NotOwner => StatusCode::FORBIDDEN,
                LeaveArtistError::InvalidNewOwner => StatusCode::BAD_REQUEST,
            },
            ApiError::Event(err) => match err {
                EventError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EventError::Permission(p) => permission_status(p),
                EventError::NotFound | EventError::ExpenseNotFound => StatusCode::NOT_FOUND,
                EventError::Calendar(_) | EventError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Invite(err) => match err {
                InviteError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                InviteError::Permission(p) => permission_status(p),
                InviteError::NotFound | InviteError::UserNotFound => StatusCode::NOT_FOUND,
                InviteError::InvalidEmail | InviteError::OwnerRoleNotInvitable => {
                    StatusCode::BAD_REQUEST
                }
                InviteError::AlreadyMember
                | InviteError::AlreadyInvited
                | InviteError::NotPending => StatusCode::CONFLICT,
            },
            ApiError::Notification(err) => match err {
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                NotificationError::NotFound => StatusCode::NOT_FOUND,
            },
            ApiError::Permission(err) => permission_status(err),
            ApiError::Calendar(_) | ApiError::Currency(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
            return (
                status,
                Json(ApiResponse::<()>::error("internal server error")),
            )
                .into_response();
        }

        let message = self.to_string();
        match self {
            // The assessment tells the client which collaborators can take over
            ApiError::LeaveArtist(LeaveArtistError::OwnershipTransferRequired(assessment)) => (
                status,
                Json(ApiResponse::<(), _>::error_with_data(&message, *assessment)),
            )
                .into_response(),
            _ => (status, Json(ApiResponse::<()>::error(&message))).into_response(),
        }
    }
}
