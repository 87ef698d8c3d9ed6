use crate::core::calendar::{
    CalendarEvent, CalendarWindow, SeenIndex, assign_lanes, build_agenda, build_days, build_month, build_week,
    filter_by_child,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use std::collections::HashSet;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(day: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
    day.and_hms_opt(h, min, 0).unwrap()
}

fn event(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: format!("Event {}", id),
        start,
        end,
        all_day: false,
        child_ids: Vec::new(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn all_seen(events: &[CalendarEvent]) -> SeenIndex {
    events
        .iter()
        .map(|e| (e.id.clone(), e.updated_at + Duration::hours(1)))
        .collect()
}

#[test]
fn test_month_window_has_42_cells_from_week_start() {
    let window = CalendarWindow::month(2024, 5, Weekday::Sun).unwrap();
    assert_eq!(window.start, date(2024, 4, 28));
    assert_eq!(window.dates().len(), 42);
    assert_eq!(window.end(), date(2024, 6, 8));

    let monday = CalendarWindow::month(2024, 4, Weekday::Mon).unwrap();
    assert_eq!(monday.start, date(2024, 4, 1));

    assert!(CalendarWindow::month(2024, 13, Weekday::Sun).is_none());
}

#[test]
fn test_week_and_agenda_windows() {
    let week = CalendarWindow::week(date(2024, 5, 15), Weekday::Mon);
    assert_eq!(week.start, date(2024, 5, 13));
    assert_eq!(week.dates().len(), 7);

    let agenda = CalendarWindow::agenda(date(2024, 5, 15));
    assert_eq!(agenda.start, date(2024, 5, 15));
    assert_eq!(agenda.end(), date(2024, 5, 28));
}

#[test]
fn test_multi_day_event_occupies_each_day() {
    let trip = event("trip", at(date(2024, 5, 10), 18, 0), at(date(2024, 5, 12), 10, 0));
    let window = CalendarWindow::week(date(2024, 5, 10), Weekday::Mon);
    let days = build_days(&window, &[trip], &SeenIndex::new());

    let occupied: Vec<NaiveDate> = days.iter().filter(|d| !d.events.is_empty()).map(|d| d.date).collect();
    assert_eq!(occupied, vec![date(2024, 5, 10), date(2024, 5, 11), date(2024, 5, 12)]);
}

#[test]
fn test_event_ending_at_midnight_stays_on_its_day() {
    let evening = event("late", at(date(2024, 5, 10), 20, 0), at(date(2024, 5, 11), 0, 0));
    assert!(evening.occupies(date(2024, 5, 10)));
    assert!(!evening.occupies(date(2024, 5, 11)));

    let mut holiday = event("holiday", at(date(2024, 5, 10), 0, 0), at(date(2024, 5, 11), 0, 0));
    holiday.all_day = true;
    assert!(holiday.occupies(date(2024, 5, 11)));
}

#[test]
fn test_month_caps_markers_at_three() {
    let day = date(2024, 5, 20);
    let events: Vec<CalendarEvent> = (0..5)
        .map(|i| event(&i.to_string(), at(day, 8 + i, 0), at(day, 9 + i, 0)))
        .collect();
    let grid = build_month(2024, 5, Weekday::Sun, &events, &all_seen(&events)).unwrap();

    let cell = grid.cells.iter().find(|c| c.date == day).unwrap();
    assert_eq!(cell.markers.len(), 3);
    assert_eq!(cell.overflow, 2);
    assert_eq!(cell.markers[0].id, "0");
    assert!(cell.in_month);
    assert!(!grid.cells[0].in_month);
    assert!(!grid.has_updates);
}

#[test]
fn test_lanes_reuse_freed_slots() {
    let day = date(2024, 5, 14);
    let events = vec![
        event("c", at(day, 10, 0), at(day, 11, 0)),
        event("a", at(day, 9, 0), at(day, 10, 0)),
        event("b", at(day, 9, 30), at(day, 10, 30)),
        event("d", at(day, 10, 30), at(day, 12, 0)),
    ];
    let (laned, lanes) = assign_lanes(day, &events);

    let lane_of = |id: &str| laned.iter().find(|l| l.event.id == id).unwrap().lane;
    assert_eq!(lanes, 2);
    assert_eq!(lane_of("a"), 0);
    assert_eq!(lane_of("b"), 1);
    assert_eq!(lane_of("c"), 0);
    assert_eq!(lane_of("d"), 1);
}

#[test]
fn test_all_day_event_takes_its_own_lane() {
    let day = date(2024, 5, 14);
    let mut holiday = event("holiday", at(day, 0, 0), at(day, 0, 0));
    holiday.all_day = true;
    let events = vec![holiday, event("pickup", at(day, 15, 0), at(day, 15, 30))];
    let (_, lanes) = assign_lanes(day, &events);
    assert_eq!(lanes, 2);
}

#[test]
fn test_has_updates_propagates_to_week_and_month() {
    let day = date(2024, 5, 14);
    let seen_event = event("seen", at(day, 9, 0), at(day, 10, 0));
    let fresh_event = event("fresh", at(day, 11, 0), at(day, 12, 0));
    let mut seen = all_seen(&[seen_event.clone()]);
    let events = vec![seen_event, fresh_event.clone()];

    let week = build_week(day, Weekday::Sun, &events, &seen);
    assert!(week.has_updates);
    assert!(week.days.iter().find(|d| d.date == day).unwrap().has_updates);
    assert!(!week.days.iter().find(|d| d.date == date(2024, 5, 13)).unwrap().has_updates);

    seen.insert(fresh_event.id.clone(), fresh_event.updated_at - Duration::minutes(5));
    assert!(build_month(2024, 5, Weekday::Sun, &events, &seen).unwrap().has_updates);

    seen.insert(fresh_event.id.clone(), fresh_event.updated_at);
    assert!(!build_month(2024, 5, Weekday::Sun, &events, &seen).unwrap().has_updates);
}

#[test]
fn test_agenda_lists_only_busy_days() {
    let start = date(2024, 5, 1);
    let events = vec![
        event("in", at(date(2024, 5, 3), 9, 0), at(date(2024, 5, 3), 10, 0)),
        event("edge", at(date(2024, 5, 14), 9, 0), at(date(2024, 5, 14), 10, 0)),
        event("out", at(date(2024, 5, 15), 9, 0), at(date(2024, 5, 15), 10, 0)),
    ];
    let agenda = build_agenda(start, &events, &all_seen(&events));

    let dates: Vec<NaiveDate> = agenda.days.iter().map(|d| d.date).collect();
    assert_eq!(dates, vec![date(2024, 5, 3), date(2024, 5, 14)]);
    assert_eq!(agenda.end, date(2024, 5, 14));
}

#[test]
fn test_filter_by_child_drops_malformed_references() {
    let day = date(2024, 5, 14);
    let mut soccer = event("soccer", at(day, 9, 0), at(day, 10, 0));
    soccer.child_ids = vec!["kid-1".to_string()];
    let mut both = event("dentist", at(day, 11, 0), at(day, 12, 0));
    both.child_ids = vec!["kid-1".to_string(), "kid-2".to_string()];
    let mut broken = event("ghost", at(day, 13, 0), at(day, 14, 0));
    broken.child_ids = vec!["kid-1".to_string(), "deleted-kid".to_string()];
    let mut other = event("piano", at(day, 15, 0), at(day, 16, 0));
    other.child_ids = vec!["kid-2".to_string()];

    let known: HashSet<String> = ["kid-1", "kid-2"].iter().map(|s| s.to_string()).collect();
    let filtered = filter_by_child(&[soccer, both, broken, other], "kid-1", &known);

    let ids: Vec<&str> = filtered.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["soccer", "dentist"]);
}
