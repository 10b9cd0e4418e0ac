use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A cost attached to one event
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct EventExpense {
    pub id: Uuid,
    pub event_id: Uuid,
    pub description: String,
    pub value_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEventExpense {
    pub description: String,
    pub value_cents: i64,
}

impl EventExpense {
    pub async fn create(
        pool: &SqlitePool,
        event_id: Uuid,
        data: &CreateEventExpense,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, EventExpense>(
            r#"INSERT INTO event_expenses (id, event_id, description, value_cents, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, event_id, description, value_cents, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(data.description.trim())
        .bind(data.value_cents)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EventExpense>(
            r#"SELECT id, event_id, description, value_cents, created_at
               FROM event_expenses
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_event_id(
        pool: &SqlitePool,
        event_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, EventExpense>(
            r#"SELECT id, event_id, description, value_cents, created_at
               FROM event_expenses
               WHERE event_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    /// Sum of expenses for an artist's events in `from <= event_date < until`
    pub async fn sum_for_artist_in_range(
        pool: &SqlitePool,
        artist_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(SUM(x.value_cents), 0)
               FROM event_expenses x
               JOIN events e ON e.id = x.event_id
               WHERE e.artist_id = $1 AND e.event_date >= $2 AND e.event_date < $3"#,
        )
        .bind(artist_id)
        .bind(from)
        .bind(until)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM event_expenses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_event_id<'e, E>(executor: E, event_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM event_expenses WHERE event_id = $1")
            .bind(event_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Removes the expenses of every event belonging to the artist
    pub async fn delete_by_artist_id<'e, E>(executor: E, artist_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "DELETE FROM event_expenses WHERE event_id IN (SELECT id FROM events WHERE artist_id = $1)",
        )
        .bind(artist_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
