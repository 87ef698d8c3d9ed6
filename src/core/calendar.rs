//! Month, week and agenda layouts over den-local event times.

use crate::core::constants::{AGENDA_DAYS, MONTH_GRID_CELLS, MONTH_MARKER_LIMIT, WEEK_DAYS};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// An event with its times already converted to den-local wall-clock time.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
    pub child_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Event id to the moment the viewing user last saw it.
pub type SeenIndex = HashMap<String, DateTime<Utc>>;

impl CalendarEvent {
    pub fn first_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Timed events ending exactly at midnight don't spill into that day.
    pub fn last_date(&self) -> NaiveDate {
        if self.end <= self.start {
            return self.start.date();
        }
        if !self.all_day && self.end.time() == NaiveTime::MIN {
            return self.end.date().pred_opt().unwrap_or(self.end.date());
        }
        self.end.date()
    }

    pub fn occupies(&self, date: NaiveDate) -> bool {
        self.first_date() <= date && date <= self.last_date()
    }

    /// Missing seen records count as updated.
    pub fn has_updates(&self, seen: &SeenIndex) -> bool {
        seen.get(&self.id).is_none_or(|seen_at| self.updated_at > *seen_at)
    }

    // The part of the event inside one day, used for lane packing.
    fn span_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + Duration::days(1);
        if self.all_day {
            return (day_start, day_end);
        }
        (self.start.max(day_start), self.end.min(day_end).max(self.start.max(day_start)))
    }
}

/// A run of consecutive days to lay events out on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarWindow {
    pub start: NaiveDate,
    pub days: usize,
    /// Set for month grids so leading/trailing days can be dimmed.
    pub month: Option<(i32, u32)>,
}

fn week_start_on_or_before(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let back = (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    date - Duration::days(i64::from(back))
}

impl CalendarWindow {
    /// Six full weeks starting on the week-start day on or before the 1st.
    pub fn month(year: i32, month: u32, week_start: Weekday) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(CalendarWindow {
            start: week_start_on_or_before(first, week_start),
            days: MONTH_GRID_CELLS,
            month: Some((year, month)),
        })
    }

    pub fn week(date: NaiveDate, week_start: Weekday) -> Self {
        CalendarWindow {
            start: week_start_on_or_before(date, week_start),
            days: WEEK_DAYS,
            month: None,
        }
    }

    pub fn agenda(date: NaiveDate) -> Self {
        CalendarWindow {
            start: date,
            days: AGENDA_DAYS,
            month: None,
        }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.days as i64)
            .filter_map(|i| self.start.checked_add_signed(Duration::days(i)))
            .collect()
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.days as i64 - 1)
    }

    pub fn in_month(&self, date: NaiveDate) -> bool {
        match self.month {
            Some((year, month)) => date.year() == year && date.month() == month,
            None => true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub events: Vec<CalendarEvent>,
    pub has_updates: bool,
}

/// Buckets events into each day of the window they occupy, sorted by start.
pub fn build_days(window: &CalendarWindow, events: &[CalendarEvent], seen: &SeenIndex) -> Vec<DayCell> {
    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));

    window
        .dates()
        .into_iter()
        .map(|date| {
            let day_events: Vec<CalendarEvent> =
                sorted.iter().filter(|e| e.occupies(date)).map(|e| (*e).clone()).collect();
            let has_updates = day_events.iter().any(|e| e.has_updates(seen));
            DayCell {
                date,
                in_month: window.in_month(date),
                events: day_events,
                has_updates,
            }
        })
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub markers: Vec<CalendarEvent>,
    /// Events on this day beyond the marker limit.
    pub overflow: usize,
    pub has_updates: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<MonthCell>,
    pub has_updates: bool,
}

pub fn build_month(
    year: i32,
    month: u32,
    week_start: Weekday,
    events: &[CalendarEvent],
    seen: &SeenIndex,
) -> Option<MonthGrid> {
    let window = CalendarWindow::month(year, month, week_start)?;
    let cells: Vec<MonthCell> = build_days(&window, events, seen)
        .into_iter()
        .map(|day| {
            let overflow = day.events.len().saturating_sub(MONTH_MARKER_LIMIT);
            MonthCell {
                date: day.date,
                in_month: day.in_month,
                markers: day.events.into_iter().take(MONTH_MARKER_LIMIT).collect(),
                overflow,
                has_updates: day.has_updates,
            }
        })
        .collect();
    let has_updates = cells.iter().any(|c| c.has_updates);
    Some(MonthGrid {
        year,
        month,
        cells,
        has_updates,
    })
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct LanedEvent {
    pub event: CalendarEvent,
    pub lane: usize,
}

/// Packs one day's events into lanes: each event takes the first lane whose
/// previous event has ended by its start, or opens a new lane.
pub fn assign_lanes(date: NaiveDate, events: &[CalendarEvent]) -> (Vec<LanedEvent>, usize) {
    let mut spans: Vec<(NaiveDateTime, NaiveDateTime, &CalendarEvent)> = events
        .iter()
        .map(|e| {
            let (start, end) = e.span_on(date);
            (start, end, e)
        })
        .collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut lane_ends: Vec<NaiveDateTime> = Vec::new();
    let mut laned = Vec::with_capacity(spans.len());
    for (start, end, event) in spans {
        let lane = match lane_ends.iter().position(|lane_end| *lane_end <= start) {
            Some(free) => {
                lane_ends[free] = end;
                free
            }
            None => {
                lane_ends.push(end);
                lane_ends.len() - 1
            }
        };
        laned.push(LanedEvent {
            event: event.clone(),
            lane,
        });
    }
    (laned, lane_ends.len())
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub events: Vec<LanedEvent>,
    pub lane_count: usize,
    pub has_updates: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WeekView {
    pub start: NaiveDate,
    pub days: Vec<WeekDay>,
    pub has_updates: bool,
}

pub fn build_week(date: NaiveDate, week_start: Weekday, events: &[CalendarEvent], seen: &SeenIndex) -> WeekView {
    let window = CalendarWindow::week(date, week_start);
    let days: Vec<WeekDay> = build_days(&window, events, seen)
        .into_iter()
        .map(|day| {
            let (laned, lane_count) = assign_lanes(day.date, &day.events);
            WeekDay {
                date: day.date,
                events: laned,
                lane_count,
                has_updates: day.has_updates,
            }
        })
        .collect();
    let has_updates = days.iter().any(|d| d.has_updates);
    WeekView {
        start: window.start,
        days,
        has_updates,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AgendaView {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Only days that have at least one event.
    pub days: Vec<DayCell>,
    pub has_updates: bool,
}

pub fn build_agenda(date: NaiveDate, events: &[CalendarEvent], seen: &SeenIndex) -> AgendaView {
    let window = CalendarWindow::agenda(date);
    let days: Vec<DayCell> = build_days(&window, events, seen)
        .into_iter()
        .filter(|d| !d.events.is_empty())
        .collect();
    let has_updates = days.iter().any(|d| d.has_updates);
    AgendaView {
        start: window.start,
        end: window.end(),
        days,
        has_updates,
    }
}

/// Events tagged with `child_id`. Events pointing at children outside
/// `known_children` are dropped as malformed.
pub fn filter_by_child(events: &[CalendarEvent], child_id: &str, known_children: &HashSet<String>) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|e| e.child_ids.iter().all(|c| known_children.contains(c)))
        .filter(|e| e.child_ids.iter().any(|c| c == child_id))
        .cloned()
        .collect()
}
