//! Conversion filter tests: window bounds, event matching, join, dedup.

use chrono::{NaiveDate, NaiveDateTime};
use lift_core::{
    conversion_filter::{filter_conversions, StudyWindow, ValidConversion},
    event::ConversionEvent,
    study::GroupAssignment,
    types::GroupName,
};

fn at(date: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
}

fn window() -> StudyWindow {
    StudyWindow::new(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
    )
}

fn assignments() -> Vec<GroupAssignment> {
    vec![
        GroupAssignment::new("15550000001", GroupName::Control),
        GroupAssignment::new("15550000002", GroupName::Control),
        GroupAssignment::new("15550000003", GroupName::Test),
        GroupAssignment::new("15550000004", GroupName::Test),
    ]
}

fn purchase(phone: &str, date: &str, time: &str) -> ConversionEvent {
    ConversionEvent::new(phone, "Purchase", at(date, time))
}

#[test]
fn window_is_inclusive_on_both_ends() {
    let events = vec![
        purchase("15550000001", "2024-05-01", "00:00:00"),
        purchase("15550000002", "2024-05-31", "23:59:59"),
        purchase("15550000003", "2024-04-30", "23:59:59"),
        purchase("15550000004", "2024-06-01", "00:00:00"),
    ];
    let valid = filter_conversions(&events, window(), "Purchase", &assignments());

    assert_eq!(valid.len(), 2);
    assert_eq!(valid.count_for(GroupName::Control), 2);
    assert_eq!(valid.count_for(GroupName::Test), 0);
}

#[test]
fn event_name_must_match_exactly() {
    let events = vec![
        ConversionEvent::new("15550000001", "purchase", at("2024-05-10", "12:00:00")),
        ConversionEvent::new("15550000002", "Purchase ", at("2024-05-10", "12:00:00")),
        ConversionEvent::new("15550000003", "AddToCart", at("2024-05-10", "12:00:00")),
        ConversionEvent::new("15550000004", "Purchase", at("2024-05-10", "12:00:00")),
    ];
    let valid = filter_conversions(&events, window(), "Purchase", &assignments());

    let rows: Vec<&ValidConversion> = valid.iter().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].phone_number, "15550000004");
    assert_eq!(rows[0].group_name, GroupName::Test);
}

#[test]
fn participants_without_an_arm_are_dropped() {
    let events = vec![
        purchase("15559999999", "2024-05-10", "12:00:00"),
        purchase("15550000003", "2024-05-10", "12:00:00"),
    ];
    let valid = filter_conversions(&events, window(), "Purchase", &assignments());
    assert_eq!(valid.len(), 1);
}

#[test]
fn repeat_conversions_collapse_to_one() {
    let events = vec![
        purchase("15550000003", "2024-05-02", "09:00:00"),
        purchase("15550000003", "2024-05-02", "09:00:00"),
        purchase("15550000003", "2024-05-20", "18:30:00"),
    ];
    let valid = filter_conversions(&events, window(), "Purchase", &assignments());
    assert_eq!(valid.len(), 1);
    assert_eq!(valid.count_for(GroupName::Test), 1);
}

#[test]
fn no_matching_events_is_empty_not_an_error() {
    let valid = filter_conversions(&[], window(), "Purchase", &assignments());
    assert!(valid.is_empty());
}

#[test]
fn input_order_does_not_matter() {
    let mut events = vec![
        purchase("15550000001", "2024-05-03", "10:00:00"),
        purchase("15550000003", "2024-05-04", "10:00:00"),
        purchase("15550000003", "2024-05-05", "10:00:00"),
        purchase("15550000004", "2024-05-06", "10:00:00"),
        purchase("15550000002", "2024-06-06", "10:00:00"),
    ];
    let forward = filter_conversions(&events, window(), "Purchase", &assignments());
    events.reverse();
    let backward = filter_conversions(&events, window(), "Purchase", &assignments());
    assert_eq!(forward, backward);
}

#[test]
fn refiltering_is_idempotent() {
    let events = vec![
        purchase("15550000001", "2024-05-03", "10:00:00"),
        purchase("15550000003", "2024-05-04", "10:00:00"),
        purchase("15550000003", "2024-05-05", "10:00:00"),
        purchase("15559999999", "2024-05-06", "10:00:00"),
    ];
    let once = filter_conversions(&events, window(), "Purchase", &assignments());
    let twice = filter_conversions(&events, window(), "Purchase", &once.as_assignments());
    assert_eq!(once, twice);
}

#[test]
fn unnormalized_assignments_silently_miss() {
    let raw = vec![GroupAssignment::new("+1 (555) 000-0003", GroupName::Test)];
    let events = vec![purchase("+1 555 000 0003", "2024-05-04", "10:00:00")];

    assert!(filter_conversions(&events, window(), "Purchase", &raw).is_empty());

    let normalized: Vec<GroupAssignment> =
        raw.into_iter().map(GroupAssignment::normalized).collect();
    assert_eq!(filter_conversions(&events, window(), "Purchase", &normalized).len(), 1);
}
