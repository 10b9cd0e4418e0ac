use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Category of a scheduled event
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "event_tag", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventTag {
    #[default]
    Show,
    Rehearsal,
    Recording,
    Meeting,
    Travel,
    Other,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Event {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub title: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub value_cents: Option<i64>, // Fee in cents, hidden from roles without financial access
    pub tag: EventTag,
    pub confirmed: bool,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEvent {
    pub title: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub value_cents: Option<i64>,
    pub tag: Option<EventTag>,
    pub confirmed: Option<bool>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl CreateEvent {
    pub fn new(title: impl Into<String>, event_date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            title: title.into(),
            event_date,
            start_time,
            end_time: None,
            value_cents: None,
            tag: None,
            confirmed: None,
            location: None,
            notes: None,
        }
    }
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub value_cents: Option<i64>,
    pub tag: Option<EventTag>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

const EVENT_COLUMNS: &str = "id, artist_id, title, event_date, start_time, end_time, value_cents, \
     tag, confirmed, location, notes, created_by, created_at, updated_at";

impl Event {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        artist_id: Uuid,
        created_by: Uuid,
        data: &CreateEvent,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Event>(&format!(
            r#"INSERT INTO events (id, artist_id, title, event_date, start_time, end_time,
                                   value_cents, tag, confirmed, location, notes, created_by,
                                   created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(artist_id)
        .bind(data.title.trim())
        .bind(data.event_date)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.value_cents)
        .bind(data.tag.unwrap_or_default())
        .bind(data.confirmed.unwrap_or(false))
        .bind(&data.location)
        .bind(&data.notes)
        .bind(created_by)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Events of an artist in chronological order
    pub async fn find_by_artist_id(
        pool: &SqlitePool,
        artist_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            r#"SELECT {EVENT_COLUMNS}
               FROM events
               WHERE artist_id = $1
               ORDER BY event_date ASC, start_time ASC"#
        ))
        .bind(artist_id)
        .fetch_all(pool)
        .await
    }

    /// Events with `from <= event_date < until`, chronologically
    pub async fn find_in_range(
        pool: &SqlitePool,
        artist_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            r#"SELECT {EVENT_COLUMNS}
               FROM events
               WHERE artist_id = $1 AND event_date >= $2 AND event_date < $3
               ORDER BY event_date ASC, start_time ASC"#
        ))
        .bind(artist_id)
        .bind(from)
        .bind(until)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateEvent,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            r#"UPDATE events
               SET title = COALESCE($2, title),
                   event_date = COALESCE($3, event_date),
                   start_time = COALESCE($4, start_time),
                   end_time = COALESCE($5, end_time),
                   value_cents = COALESCE($6, value_cents),
                   tag = COALESCE($7, tag),
                   location = COALESCE($8, location),
                   notes = COALESCE($9, notes),
                   updated_at = $10
               WHERE id = $1
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(data.event_date)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.value_cents)
        .bind(data.tag)
        .bind(&data.location)
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn set_confirmed(
        pool: &SqlitePool,
        id: Uuid,
        confirmed: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            r#"UPDATE events SET confirmed = $2, updated_at = $3
               WHERE id = $1
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(confirmed)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Sum of event fees in `from <= event_date < until`
    pub async fn sum_values_in_range(
        pool: &SqlitePool,
        artist_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(SUM(value_cents), 0)
               FROM events
               WHERE artist_id = $1 AND event_date >= $2 AND event_date < $3"#,
        )
        .bind(artist_id)
        .bind(from)
        .bind(until)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_artist_id<'e, E>(executor: E, artist_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM events WHERE artist_id = $1")
            .bind(artist_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
