//! Month grids for the calendar view: whole weeks covering a month, with events per day.

use chrono::{Datelike, Duration, NaiveDate};
use db::models::event::Event;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for the padding days borrowed from the neighbouring months
    pub in_month: bool,
    pub is_today: bool,
    pub event_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub week_start: WeekStart,
    pub weeks: Vec<Vec<CalendarDay>>,
}

/// First day of the month and first day of the following month
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    if !(1..=9998).contains(&year) {
        return Err(CalendarError::InvalidYear(year));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidYear(year))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or(CalendarError::InvalidYear(next_year))?;
    Ok((first, next))
}

pub fn month_grid(
    year: i32,
    month: u32,
    week_start: WeekStart,
    today: Option<NaiveDate>,
) -> Result<MonthGrid, CalendarError> {
    let (first, next) = month_bounds(year, month)?;
    let days_in_month = (next - first).num_days();
    let offset = i64::from(match week_start {
        WeekStart::Sunday => first.weekday().num_days_from_sunday(),
        WeekStart::Monday => first.weekday().num_days_from_monday(),
    });
    let week_count = (offset + days_in_month + 6) / 7;
    let grid_start = first - Duration::days(offset);

    let weeks = (0..week_count)
        .map(|week| {
            (0..7)
                .map(|weekday| {
                    let date = grid_start + Duration::days(week * 7 + weekday);
                    CalendarDay {
                        date,
                        in_month: date.month() == month && date.year() == year,
                        is_today: today == Some(date),
                        event_ids: Vec::new(),
                    }
                })
                .collect()
        })
        .collect();

    Ok(MonthGrid {
        year,
        month,
        week_start,
        weeks,
    })
}

impl MonthGrid {
    pub fn days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.weeks.iter().flatten()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days().find(|d| d.date == date)
    }

    /// Attach each event to the cell of its date; events outside the grid are ignored
    pub fn attach_events(&mut self, events: &[Event]) {
        for event in events {
            if let Some(day) = self
                .weeks
                .iter_mut()
                .flatten()
                .find(|d| d.date == event.event_date)
            {
                day.event_ids.push(event.id);
            }
        }
    }
}
