use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, put},
};
use chrono::{Datelike, NaiveDate, Utc};
use db::models::{
    event::{CreateEvent, Event, UpdateEvent},
    event_expense::{CreateEventExpense, EventExpense},
};
use serde::Deserialize;
use services::services::{
    calendar::{MonthGrid, WeekStart},
    events::FinancialSummary,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, auth::CurrentUser, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    /// Both parts or neither
    fn selected(&self) -> Result<Option<(i32, u32)>, ApiError> {
        match (self.year, self.month) {
            (Some(year), Some(month)) => Ok(Some((year, month))),
            (None, None) => Ok(None),
            _ => Err(ApiError::BadRequest(
                "year and month must be given together".to_string(),
            )),
        }
    }

    fn or_current(&self, today: NaiveDate) -> Result<(i32, u32), ApiError> {
        Ok(self.selected()?.unwrap_or((today.year(), today.month())))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    #[serde(default)]
    pub week_start: WeekStart,
}

#[derive(Debug, Deserialize, TS)]
pub struct SetConfirmed {
    pub confirmed: bool,
}

pub async fn list_events(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Event>>>, ApiError> {
    let events = deployment
        .events()
        .list(user.id(), artist_id, query.selected()?)
        .await?;
    Ok(ResponseJson(ApiResponse::success(events)))
}

pub async fn create_event(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Json(payload): Json<CreateEvent>,
) -> Result<ResponseJson<ApiResponse<Event>>, ApiError> {
    let event = deployment
        .events()
        .create(user.id(), artist_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn get_event(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Event>>, ApiError> {
    let event = deployment.events().get(user.id(), event_id).await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn update_event(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<UpdateEvent>,
) -> Result<ResponseJson<ApiResponse<Event>>, ApiError> {
    let event = deployment
        .events()
        .update(user.id(), event_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn set_confirmed(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<SetConfirmed>,
) -> Result<ResponseJson<ApiResponse<Event>>, ApiError> {
    let event = deployment
        .events()
        .set_confirmed(user.id(), event_id, payload.confirmed)
        .await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn delete_event(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.events().delete(user.id(), event_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_expenses(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<EventExpense>>>, ApiError> {
    let expenses = deployment.events().expenses(user.id(), event_id).await?;
    Ok(ResponseJson(ApiResponse::success(expenses)))
}

pub async fn add_expense(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<CreateEventExpense>,
) -> Result<ResponseJson<ApiResponse<EventExpense>>, ApiError> {
    let expense = deployment
        .events()
        .add_expense(user.id(), event_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(expense)))
}

pub async fn delete_expense(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .events()
        .delete_expense(user.id(), expense_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Month grid for the calendar view; defaults to the current month
pub async fn get_calendar(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<ResponseJson<ApiResponse<MonthGrid>>, ApiError> {
    let today = Utc::now().date_naive();
    let (year, month) = MonthQuery {
        year: query.year,
        month: query.month,
    }
    .or_current(today)?;
    let grid = deployment
        .events()
        .calendar(user.id(), artist_id, year, month, query.week_start, Some(today))
        .await?;
    Ok(ResponseJson(ApiResponse::success(grid)))
}

pub async fn get_finances(
    State(deployment): State<Deployment>,
    user: CurrentUser,
    Path(artist_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<ResponseJson<ApiResponse<FinancialSummary>>, ApiError> {
    let (year, month) = query.or_current(Utc::now().date_naive())?;
    let summary = deployment
        .events()
        .financial_summary(user.id(), artist_id, year, month)
        .await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route(
            "/artists/{artist_id}/events",
            get(list_events).post(create_event),
        )
        .route("/artists/{artist_id}/calendar", get(get_calendar))
        .route("/artists/{artist_id}/finances", get(get_finances))
        .route(
            "/events/{event_id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{event_id}/confirmed", put(set_confirmed))
        .route(
            "/events/{event_id}/expenses",
            get(list_expenses).post(add_expense),
        )
        .route("/expenses/{expense_id}", delete(delete_expense))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_query_requires_both_parts() {
        let query = MonthQuery {
            year: Some(2025),
            month: None,
        };
        assert!(query.selected().is_err());
        assert_eq!(MonthQuery::default().selected().unwrap(), None);
    }

    #[test]
    fn test_month_query_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(MonthQuery::default().or_current(today).unwrap(), (2025, 3));
        let query = MonthQuery {
            year: Some(2024),
            month: Some(12),
        };
        assert_eq!(query.or_current(today).unwrap(), (2024, 12));
    }
}
