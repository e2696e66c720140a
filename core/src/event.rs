//! The conversion event log: one row per tracked user action.
//!
//! The log is an append-only CSV blob with at least the columns
//! `event_time`, `event_name` and `user_phone`. Extra columns are ignored.

use crate::{
    error::{LiftError, LiftResult},
    types::{normalize_phone, PhoneNumber},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const EVENT_TIME_COLUMN: &str = "event_time";
pub const EVENT_NAME_COLUMN: &str = "event_name";
pub const PHONE_COLUMN: &str = "user_phone";

/// A single logged event. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub user_phone: PhoneNumber,
    pub event_name: String,
    pub event_time: NaiveDateTime,
}

impl ConversionEvent {
    pub fn new(user_phone: &str, event_name: &str, event_time: NaiveDateTime) -> Self {
        Self {
            user_phone: normalize_phone(user_phone),
            event_name: event_name.to_string(),
            event_time,
        }
    }

    pub fn event_date(&self) -> NaiveDate {
        self.event_time.date()
    }
}

/// Parse the raw bytes of an event-log CSV.
pub fn parse_event_log(raw: &[u8]) -> LiftResult<Vec<ConversionEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(raw);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LiftError::Data(format!("Event log is missing the '{name}' column.")))
    };
    let time_idx = column(EVENT_TIME_COLUMN)?;
    let name_idx = column(EVENT_NAME_COLUMN)?;
    let phone_idx = column(PHONE_COLUMN)?;

    let mut events = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // event_name stays verbatim; conversions match it exactly.
        let raw_time = record.get(time_idx).unwrap_or_default().trim();
        let event_time = parse_timestamp(raw_time).ok_or_else(|| {
            // +2: one for the header, one for 1-based numbering
            LiftError::Data(format!(
                "Unparseable event_time '{raw_time}' on line {}.",
                i + 2
            ))
        })?;
        events.push(ConversionEvent::new(
            record.get(phone_idx).unwrap_or_default(),
            record.get(name_idx).unwrap_or_default(),
            event_time,
        ));
    }

    log::debug!("parsed {} events from event log", events.len());
    Ok(events)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]`
/// or a bare date (midnight). Offsets are dropped after converting to the
/// timestamp's own local wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05").map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn reads_csv_and_normalizes_phones() {
        let raw = b"event_time,event_name,user_phone,value\n\
                    2024-03-05 10:00:00,Purchase,+1 (555) 000-1111,9.99\n\
                    2024-03-06 11:00:00,AddToCart,15550002222,\n";
        let events = parse_event_log(raw).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].user_phone, "15550001111");
        assert_eq!(events[0].event_name, "Purchase");
        assert_eq!(events[1].event_date(), NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
    }

    #[test]
    fn event_names_are_kept_verbatim() {
        use crate::{
            conversion_filter::{filter_conversions, StudyWindow},
            study::GroupAssignment,
            types::GroupName,
        };

        let raw = b"event_time,event_name,user_phone\n\
                    2024-05-02 10:00:00 ,Purchase ,15551000000\n";
        let events = parse_event_log(raw).unwrap();
        assert_eq!(events[0].event_name, "Purchase ");
        assert_eq!(events[0].event_date(), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());

        let window = StudyWindow::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        );
        let assignments = [GroupAssignment::new("15551000000", GroupName::Control)];
        assert!(filter_conversions(&events, window, "Purchase", &assignments).is_empty());
        assert_eq!(filter_conversions(&events, window, "Purchase ", &assignments).len(), 1);
    }

    #[test]
    fn missing_column_is_a_data_error() {
        let raw = b"event_time,event_name\n2024-03-05,Purchase\n";
        assert!(matches!(parse_event_log(raw), Err(LiftError::Data(_))));
    }

    #[test]
    fn bad_timestamp_names_the_line() {
        let raw = b"event_time,event_name,user_phone\n2024-03-05,Purchase,1\nsoon,Purchase,2\n";
        let err = parse_event_log(raw).unwrap_err();
        assert!(err.to_string().contains("line 3"), "got: {err}");
    }
}
