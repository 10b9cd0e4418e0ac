//! Server-sent change stream for one artist, used by clients to refresh their views.

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures_util::{Stream, StreamExt};
use services::services::permissions;
use tracing::debug;
use uuid::Uuid;

use crate::{Deployment, auth::CurrentUser, error::ApiError};

/// Streams the artist's changes until the caller's membership or the artist is deleted;
/// that final change is still delivered.
pub async fn stream_changes(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let member = permissions::membership(&deployment.db().pool, artist_id, user.id()).await?;

    let stream = deployment
        .feed()
        .subscribe_member(artist_id, member.id)
        .map(|change| {
            Event::default()
                .event(change.table.to_string())
                .json_data(&change)
        });
    debug!(
        artist_id = %artist_id,
        user_id = %user.id(),
        subscribers = deployment.feed().subscriber_count(),
        "Change stream opened"
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/artists/{artist_id}/changes", get(stream_changes))
}
