//! In-process change feed. Writers publish after commit; subscribers get every change
//! for the artists they watch, last message wins.

use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeTable {
    Artists,
    ArtistCollaborators,
    Events,
    EventExpenses,
    ArtistInvites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub artist_id: Uuid,
    pub record_id: Uuid,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: ChangeTable, kind: ChangeKind, artist_id: Uuid, record_id: Uuid) -> Self {
        Self {
            table,
            kind,
            artist_id,
            record_id,
            at: Utc::now(),
        }
    }

    /// True for the deletion of the artist or of the given membership row
    pub fn ends_membership(&self, membership_id: Uuid) -> bool {
        self.kind == ChangeKind::Delete
            && match self.table {
                ChangeTable::Artists => true,
                ChangeTable::ArtistCollaborators => self.record_id == membership_id,
                _ => false,
            }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        debug!(
            table = %event.table,
            kind = %event.kind,
            artist_id = %event.artist_id,
            record_id = %event.record_id,
            "Publishing change"
        );
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of changes touching one artist. Lagging subscribers skip what they missed.
    pub fn subscribe_artist(&self, artist_id: Uuid) -> impl Stream<Item = ChangeEvent> + Send + use<> {
        let receiver = self.sender.subscribe();
        BroadcastStream::new(receiver).filter_map(move |item| async move {
            match item {
                Ok(event) if event.artist_id == artist_id => Some(event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(artist_id = %artist_id, skipped, "Change feed subscriber lagged");
                    None
                }
            }
        })
    }

    /// Changes of one artist as seen by the holder of `membership_id`. The stream yields the
    /// artist's deletion or the removal of that membership, then ends.
    pub fn subscribe_member(
        &self,
        artist_id: Uuid,
        membership_id: Uuid,
    ) -> impl Stream<Item = ChangeEvent> + Send + use<> {
        let events = Box::pin(self.subscribe_artist(artist_id));
        stream::unfold(Some(events), move |events| async move {
            let mut events = events?;
            let event = events.next().await?;
            let rest = (!event.ends_membership(membership_id)).then_some(events);
            Some((event, rest))
        })
    }
}
