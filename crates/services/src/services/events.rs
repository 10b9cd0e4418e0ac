//! Show scheduling and the money attached to it.

use chrono::NaiveDate;
use db::models::{
    artist_collaborator::CollaboratorRole,
    event::{CreateEvent, Event, UpdateEvent},
    event_expense::{CreateEventExpense, EventExpense},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    calendar::{self, CalendarError, MonthGrid, WeekStart},
    currency::format_brl,
    permissions::{self, Capability, PermissionError},
    realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable},
};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("event not found")]
    NotFound,
    #[error("expense not found")]
    ExpenseNotFound,
    #[error("invalid event: {0}")]
    Validation(String),
}

/// Revenue and costs of an artist's events in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct FinancialSummary {
    pub year: i32,
    pub month: u32,
    pub revenue_cents: i64,
    pub expenses_cents: i64,
    pub net_cents: i64,
    pub revenue: String,
    pub expenses: String,
    pub net: String,
}

#[derive(Clone)]
pub struct EventService {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl EventService {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
        data: &CreateEvent,
    ) -> Result<Event, EventError> {
        permissions::require(&self.pool, artist_id, user_id, Capability::CreateEvents).await?;
        validate_event(
            &data.title,
            data.start_time,
            data.end_time,
            data.value_cents,
        )?;

        let event = Event::create(&self.pool, Uuid::new_v4(), artist_id, user_id, data).await?;
        info!(event_id = %event.id, artist_id = %artist_id, date = %event.event_date, "Event created");
        self.publish(ChangeTable::Events, ChangeKind::Insert, artist_id, event.id);
        Ok(event)
    }

    /// Events of the artist, limited to one month when `month` is given.
    /// Fees are hidden from roles without financial access.
    pub async fn list(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
        month: Option<(i32, u32)>,
    ) -> Result<Vec<Event>, EventError> {
        let member = permissions::require(&self.pool, artist_id, user_id, Capability::ViewEvents).await?;
        let events = match month {
            Some((year, month)) => {
                let (from, until) = calendar::month_bounds(year, month)?;
                Event::find_in_range(&self.pool, artist_id, from, until).await?
            }
            None => Event::find_by_artist_id(&self.pool, artist_id).await?,
        };
        Ok(redact_all(events, member.role))
    }

    pub async fn get(&self, user_id: Uuid, event_id: Uuid) -> Result<Event, EventError> {
        let event = self.find(event_id).await?;
        let member =
            permissions::require(&self.pool, event.artist_id, user_id, Capability::ViewEvents)
                .await?;
        Ok(redact(event, member.role))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        data: &UpdateEvent,
    ) -> Result<Event, EventError> {
        let existing = self.find(event_id).await?;
        permissions::require(
            &self.pool,
            existing.artist_id,
            user_id,
            Capability::CreateEvents,
        )
        .await?;
        validate_event(
            data.title.as_deref().unwrap_or(&existing.title),
            data.start_time.unwrap_or(existing.start_time),
            data.end_time.or(existing.end_time),
            data.value_cents,
        )?;

        let event = Event::update(&self.pool, event_id, data)
            .await?
            .ok_or(EventError::NotFound)?;
        self.publish(ChangeTable::Events, ChangeKind::Update, event.artist_id, event.id);
        Ok(event)
    }

    pub async fn set_confirmed(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        confirmed: bool,
    ) -> Result<Event, EventError> {
        let existing = self.find(event_id).await?;
        let member = permissions::require(
            &self.pool,
            existing.artist_id,
            user_id,
            Capability::CreateEvents,
        )
        .await?;

        let event = Event::set_confirmed(&self.pool, event_id, confirmed)
            .await?
            .ok_or(EventError::NotFound)?;
        info!(event_id = %event_id, confirmed, "Event confirmation changed");
        self.publish(ChangeTable::Events, ChangeKind::Update, event.artist_id, event.id);
        Ok(redact(event, member.role))
    }

    /// Delete an event together with its expenses
    pub async fn delete(&self, user_id: Uuid, event_id: Uuid) -> Result<(), EventError> {
        let existing = self.find(event_id).await?;
        permissions::require(
            &self.pool,
            existing.artist_id,
            user_id,
            Capability::DeleteEvents,
        )
        .await?;

        let mut tx = self.pool.begin().await?;
        EventExpense::delete_by_event_id(&mut *tx, event_id).await?;
        Event::delete(&mut *tx, event_id).await?;
        tx.commit().await?;

        info!(event_id = %event_id, artist_id = %existing.artist_id, "Event deleted");
        self.publish(ChangeTable::Events, ChangeKind::Delete, existing.artist_id, event_id);
        Ok(())
    }

    pub async fn add_expense(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        data: &CreateEventExpense,
    ) -> Result<EventExpense, EventError> {
        let event = self.find(event_id).await?;
        permissions::require(&self.pool, event.artist_id, user_id, Capability::CreateEvents)
            .await?;
        if data.description.trim().is_empty() {
            return Err(EventError::Validation("expense description is required".into()));
        }
        if data.value_cents < 0 {
            return Err(EventError::Validation("expense value cannot be negative".into()));
        }

        let expense = EventExpense::create(&self.pool, event_id, data).await?;
        self.publish(ChangeTable::EventExpenses, ChangeKind::Insert, event.artist_id, expense.id);
        Ok(expense)
    }

    pub async fn expenses(&self, user_id: Uuid, event_id: Uuid) -> Result<Vec<EventExpense>, EventError> {
        let event = self.find(event_id).await?;
        permissions::require(&self.pool, event.artist_id, user_id, Capability::ViewFinancials)
            .await?;
        Ok(EventExpense::find_by_event_id(&self.pool, event_id).await?)
    }

    pub async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), EventError> {
        let expense = EventExpense::find_by_id(&self.pool, expense_id)
            .await?
            .ok_or(EventError::ExpenseNotFound)?;
        let event = self.find(expense.event_id).await?;
        permissions::require(&self.pool, event.artist_id, user_id, Capability::CreateEvents)
            .await?;

        EventExpense::delete(&self.pool, expense_id).await?;
        self.publish(ChangeTable::EventExpenses, ChangeKind::Delete, event.artist_id, expense_id);
        Ok(())
    }

    pub async fn financial_summary(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<FinancialSummary, EventError> {
        permissions::require(&self.pool, artist_id, user_id, Capability::ViewFinancials).await?;
        let (from, until) = calendar::month_bounds(year, month)?;

        let revenue_cents = Event::sum_values_in_range(&self.pool, artist_id, from, until).await?;
        let expenses_cents =
            EventExpense::sum_for_artist_in_range(&self.pool, artist_id, from, until).await?;
        let net_cents = revenue_cents - expenses_cents;

        Ok(FinancialSummary {
            year,
            month,
            revenue_cents,
            expenses_cents,
            net_cents,
            revenue: format_brl(revenue_cents),
            expenses: format_brl(expenses_cents),
            net: format_brl(net_cents),
        })
    }

    /// Month grid for the calendar screen with the artist's events placed on their days
    pub async fn calendar(
        &self,
        user_id: Uuid,
        artist_id: Uuid,
        year: i32,
        month: u32,
        week_start: WeekStart,
        today: Option<NaiveDate>,
    ) -> Result<MonthGrid, EventError> {
        permissions::require(&self.pool, artist_id, user_id, Capability::ViewEvents).await?;
        let mut grid = calendar::month_grid(year, month, week_start, today)?;

        let (Some(first), Some(last)) = (
            grid.days().next().map(|d| d.date),
            grid.days().last().map(|d| d.date),
        ) else {
            return Ok(grid);
        };
        let until = last.succ_opt().unwrap_or(last);
        let events = Event::find_in_range(&self.pool, artist_id, first, until).await?;
        grid.attach_events(&events);
        Ok(grid)
    }

    async fn find(&self, event_id: Uuid) -> Result<Event, EventError> {
        Event::find_by_id(&self.pool, event_id)
            .await?
            .ok_or(EventError::NotFound)
    }

    fn publish(&self, table: ChangeTable, kind: ChangeKind, artist_id: Uuid, record_id: Uuid) {
        self.feed
            .publish(ChangeEvent::new(table, kind, artist_id, record_id));
    }
}

fn validate_event(
    title: &str,
    start_time: chrono::NaiveTime,
    end_time: Option<chrono::NaiveTime>,
    value_cents: Option<i64>,
) -> Result<(), EventError> {
    if title.trim().is_empty() {
        return Err(EventError::Validation("title is required".into()));
    }
    if end_time.is_some_and(|end| end < start_time) {
        return Err(EventError::Validation("end time is before start time".into()));
    }
    if value_cents.is_some_and(|v| v < 0) {
        return Err(EventError::Validation("value cannot be negative".into()));
    }
    Ok(())
}

fn redact(mut event: Event, role: CollaboratorRole) -> Event {
    if !permissions::can(role, Capability::ViewFinancials) {
        event.value_cents = None;
    }
    event
}

fn redact_all(events: Vec<Event>, role: CollaboratorRole) -> Vec<Event> {
    events.into_iter().map(|e| redact(e, role)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::services::test_support::{TestContext, count_rows};

    use CollaboratorRole::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn show(date: NaiveDate, value_cents: i64) -> CreateEvent {
        CreateEvent {
            value_cents: Some(value_cents),
            ..CreateEvent::new("Show", date, hm(21, 0))
        }
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_and_sees_no_values() {
        let ctx = TestContext::new().await;
        let editor = ctx.user("editor@example.com").await;
        let viewer = ctx.user("viewer@example.com").await;
        let artist_id = ctx.artist(&[(editor, Owner), (viewer, Viewer)]).await;
        let service = EventService::new(ctx.pool.clone(), ctx.feed.clone());

        let denied = service
            .create(viewer, artist_id, &show(ymd(2025, 6, 14), 500_000))
            .await;
        assert!(matches!(
            denied,
            Err(EventError::Permission(PermissionError::Forbidden { .. }))
        ));

        let event = service
            .create(editor, artist_id, &show(ymd(2025, 6, 14), 500_000))
            .await
            .unwrap();
        assert_eq!(event.value_cents, Some(500_000));

        let as_viewer = service.list(viewer, artist_id, None).await.unwrap();
        assert_eq!(as_viewer.len(), 1);
        assert_eq!(as_viewer[0].value_cents, None);
        assert_eq!(service.get(viewer, event.id).await.unwrap().value_cents, None);
        assert_eq!(
            service.get(editor, event.id).await.unwrap().value_cents,
            Some(500_000)
        );
    }

    #[tokio::test]
    async fn test_validation() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner)]).await;
        let service = EventService::new(ctx.pool.clone(), ctx.feed.clone());

        let backwards = CreateEvent {
            end_time: Some(hm(20, 0)),
            ..CreateEvent::new("Show", ymd(2025, 6, 14), hm(21, 0))
        };
        assert!(matches!(
            service.create(owner, artist_id, &backwards).await,
            Err(EventError::Validation(_))
        ));
        assert!(matches!(
            service
                .create(owner, artist_id, &CreateEvent::new(" ", ymd(2025, 6, 14), hm(21, 0)))
                .await,
            Err(EventError::Validation(_))
        ));
        assert!(matches!(
            service.create(owner, artist_id, &show(ymd(2025, 6, 14), -1)).await,
            Err(EventError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_month_filter_and_confirmation() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner)]).await;
        let service = EventService::new(ctx.pool.clone(), ctx.feed.clone());

        let june = service
            .create(owner, artist_id, &show(ymd(2025, 6, 30), 10_000))
            .await
            .unwrap();
        service
            .create(owner, artist_id, &show(ymd(2025, 7, 1), 20_000))
            .await
            .unwrap();

        let listed = service.list(owner, artist_id, Some((2025, 6))).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, june.id);
        assert!(!listed[0].confirmed);

        let confirmed = service.set_confirmed(owner, june.id, true).await.unwrap();
        assert!(confirmed.confirmed);

        let updated = service
            .update(
                owner,
                june.id,
                &UpdateEvent {
                    title: Some("Festival".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Festival");
        assert_eq!(updated.value_cents, Some(10_000));
        assert!(updated.confirmed);
    }

    #[tokio::test]
    async fn test_expenses_and_summary() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let viewer = ctx.user("viewer@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner), (viewer, Viewer)]).await;
        let service = EventService::new(ctx.pool.clone(), ctx.feed.clone());

        let first = service
            .create(owner, artist_id, &show(ymd(2025, 6, 7), 300_000))
            .await
            .unwrap();
        service
            .create(owner, artist_id, &show(ymd(2025, 6, 21), 150_000))
            .await
            .unwrap();
        service
            .create(owner, artist_id, &show(ymd(2025, 7, 5), 999_900))
            .await
            .unwrap();
        service
            .add_expense(
                owner,
                first.id,
                &CreateEventExpense {
                    description: "Sound engineer".to_string(),
                    value_cents: 80_000,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.expenses(viewer, first.id).await,
            Err(EventError::Permission(_))
        ));
        assert_eq!(service.expenses(owner, first.id).await.unwrap().len(), 1);

        let summary = service
            .financial_summary(owner, artist_id, 2025, 6)
            .await
            .unwrap();
        assert_eq!(summary.revenue_cents, 450_000);
        assert_eq!(summary.expenses_cents, 80_000);
        assert_eq!(summary.net_cents, 370_000);
        assert_eq!(summary.net, "R$ 3.700,00");

        assert!(matches!(
            service.financial_summary(viewer, artist_id, 2025, 6).await,
            Err(EventError::Permission(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_event_removes_expenses() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner)]).await;
        let service = EventService::new(ctx.pool.clone(), ctx.feed.clone());

        let event = service
            .create(owner, artist_id, &show(ymd(2025, 6, 7), 100_000))
            .await
            .unwrap();
        let expense = service
            .add_expense(
                owner,
                event.id,
                &CreateEventExpense {
                    description: "Fuel".to_string(),
                    value_cents: 12_000,
                },
            )
            .await
            .unwrap();

        service.delete_expense(owner, expense.id).await.unwrap();
        assert_eq!(count_rows(&ctx.pool, "event_expenses").await, 0);

        service
            .add_expense(
                owner,
                event.id,
                &CreateEventExpense {
                    description: "Hotel".to_string(),
                    value_cents: 30_000,
                },
            )
            .await
            .unwrap();
        service.delete(owner, event.id).await.unwrap();
        assert_eq!(count_rows(&ctx.pool, "events").await, 0);
        assert_eq!(count_rows(&ctx.pool, "event_expenses").await, 0);
        assert!(matches!(
            service.get(owner, event.id).await,
            Err(EventError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_calendar_places_events_including_padding_days() {
        let ctx = TestContext::new().await;
        let owner = ctx.user("owner@example.com").await;
        let artist_id = ctx.artist(&[(owner, Owner)]).await;
        let service = EventService::new(ctx.pool.clone(), ctx.feed.clone());

        let in_month = service
            .create(owner, artist_id, &show(ymd(2025, 6, 14), 0))
            .await
            .unwrap();
        let padding = service
            .create(owner, artist_id, &show(ymd(2025, 7, 5), 0))
            .await
            .unwrap();

        let grid = service
            .calendar(owner, artist_id, 2025, 6, WeekStart::Sunday, None)
            .await
            .unwrap();
        assert_eq!(grid.day(ymd(2025, 6, 14)).unwrap().event_ids, vec![in_month.id]);
        assert_eq!(grid.day(ymd(2025, 7, 5)).unwrap().event_ids, vec![padding.id]);
    }
}
