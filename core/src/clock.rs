//! Study clock. Supplies "today" for the active-study predicate.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StudyClock {
    /// The host's local calendar date.
    #[default]
    System,
    /// A pinned date (tests and replays).
    Fixed(NaiveDate),
}

impl StudyClock {
    pub fn today(&self) -> NaiveDate {
        match self {
            StudyClock::System => Local::now().date_naive(),
            StudyClock::Fixed(date) => *date,
        }
    }
}
