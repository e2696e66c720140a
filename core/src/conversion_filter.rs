//! Conversion filter: narrows the raw event log to one study's conversions.
//!
//! An event counts when:
//!   - its calendar date lies in `[start_date, end_date]` (both inclusive),
//!   - its name equals the study's conversion event exactly,
//!   - its participant holds an arm in the study.
//!
//! The result is a set of distinct (participant, arm) pairs, so repeat
//! conversions by one participant count once and input order is irrelevant.
//!
//! Phone numbers must already be normalized on both sides of the join.
//! A mismatch silently drops conversions; it is never reported as an error.

use crate::{
    event::ConversionEvent,
    study::GroupAssignment,
    types::{GroupName, PhoneNumber},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Inclusive calendar-date window of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl StudyWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { start_date, end_date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValidConversion {
    pub phone_number: PhoneNumber,
    pub group_name: GroupName,
}

/// Deduplicated (participant, arm) conversions for one study.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidConversions {
    rows: BTreeSet<ValidConversion>,
}

impl ValidConversions {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidConversion> {
        self.rows.iter()
    }

    /// Number of distinct converting participants in `group`.
    pub fn count_for(&self, group: GroupName) -> i64 {
        self.rows.iter().filter(|c| c.group_name == group).count() as i64
    }

    /// The converters as an assignment table, for re-filtering.
    pub fn as_assignments(&self) -> Vec<GroupAssignment> {
        self.rows
            .iter()
            .map(|c| GroupAssignment::new(&c.phone_number, c.group_name))
            .collect()
    }
}

impl FromIterator<ValidConversion> for ValidConversions {
    fn from_iter<I: IntoIterator<Item = ValidConversion>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Keep in-window events named `conversion_event_name`, inner-join them
/// with `assignments` on phone number and drop duplicate pairs.
pub fn filter_conversions(
    events: &[ConversionEvent],
    window: StudyWindow,
    conversion_event_name: &str,
    assignments: &[GroupAssignment],
) -> ValidConversions {
    let mut arms: HashMap<&str, Vec<GroupName>> = HashMap::new();
    for a in assignments {
        arms.entry(a.phone_number.as_str())
            .or_default()
            .push(a.group_name);
    }

    let valid: ValidConversions = events
        .iter()
        .filter(|e| window.contains(e.event_date()) && e.event_name == conversion_event_name)
        .filter_map(|e| arms.get(e.user_phone.as_str()).map(|groups| (e, groups)))
        .flat_map(|(e, groups)| {
            groups.iter().map(move |g| ValidConversion {
                phone_number: e.user_phone.clone(),
                group_name: *g,
            })
        })
        .collect();

    log::debug!(
        "filtered {} events down to {} valid conversions ({conversion_event_name})",
        events.len(),
        valid.len()
    );
    valid
}
