//! Shared primitive types used across the entire crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LiftError, LiftResult};

/// A stable, unique identifier for a lift study (32-char lowercase hex).
pub type StudyId = String;

/// A participant identifier: a phone number reduced to its digits.
pub type PhoneNumber = String;

/// Strip everything but ASCII digits from a phone number.
///
/// Both sides of the conversion join must go through this, otherwise
/// valid conversions are silently dropped.
pub fn normalize_phone(raw: &str) -> PhoneNumber {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// One of the two study arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupName {
    Control,
    Test,
}

impl GroupName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupName::Control => "control",
            GroupName::Test => "test",
        }
    }

    /// The arm a participant falls back to when this one is full.
    pub fn other(&self) -> GroupName {
        match self {
            GroupName::Control => GroupName::Test,
            GroupName::Test => GroupName::Control,
        }
    }

    pub fn parse(s: &str) -> LiftResult<Self> {
        match s {
            "control" => Ok(GroupName::Control),
            "test" => Ok(GroupName::Test),
            other => Err(LiftError::Data(format!("unknown group name '{other}'"))),
        }
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a study. Toggles `active <-> paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyStatus {
    Active,
    Paused,
}

impl StudyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStatus::Active => "active",
            StudyStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> LiftResult<Self> {
        match s {
            "active" => Ok(StudyStatus::Active),
            "paused" => Ok(StudyStatus::Paused),
            _ => Err(LiftError::Validation(
                "Status must be either 'active' or 'paused'.".into(),
            )),
        }
    }
}

impl fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_digits_only() {
        assert_eq!(normalize_phone("+1 (555) 010-2030"), "15550102030");
        assert_eq!(normalize_phone("5550102030"), "5550102030");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_eq!(StudyStatus::parse("paused").unwrap(), StudyStatus::Paused);
        assert!(matches!(
            StudyStatus::parse("stopped"),
            Err(LiftError::Validation(_))
        ));
    }
}
