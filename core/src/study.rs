//! Study records and the request payloads that create or modify them.

use crate::{
    error::{LiftError, LiftResult},
    types::{normalize_phone, GroupName, PhoneNumber, StudyId, StudyStatus},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A row of `lift_studies`.
///
/// Only `status`, `avg_message_cost` and `template_names` change after
/// creation (plus the counters maintained by participant assignment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: StudyId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sample_size: i64,
    pub template_names: Option<String>,
    pub control_group_size: i64,
    pub test_group_size: i64,
    pub messages_count: i64,
    pub avg_message_cost: f64,
    pub status: StudyStatus,
}

impl Study {
    /// A freshly created study: active, no participants, no messages.
    pub fn new(id: StudyId, request: NewStudy) -> Self {
        Self {
            id,
            name: request.name,
            start_date: request.start_date,
            end_date: request.end_date,
            sample_size: request.sample_size,
            template_names: request.template_names,
            control_group_size: 0,
            test_group_size: 0,
            messages_count: 0,
            avg_message_cost: 0.0,
            status: StudyStatus::Active,
        }
    }

    pub fn group_size(&self, group: GroupName) -> i64 {
        match group {
            GroupName::Control => self.control_group_size,
            GroupName::Test => self.test_group_size,
        }
    }

    /// An arm is full once it holds `sample_size` participants.
    pub fn is_full(&self, group: GroupName) -> bool {
        self.group_size(group) >= self.sample_size
    }

    /// The study's message templates, in declaration order.
    pub fn templates(&self) -> Vec<&str> {
        self.template_names
            .as_deref()
            .map(|names| names.split(',').map(str::trim).filter(|n| !n.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn uses_template(&self, template: &str) -> bool {
        self.templates().contains(&template)
    }
}

/// A row of `lift_studies_groups`: which arm a participant landed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub phone_number: PhoneNumber,
    pub group_name: GroupName,
}

impl GroupAssignment {
    pub fn new(phone_number: &str, group_name: GroupName) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            group_name,
        }
    }

    /// Same assignment with the phone number reduced to digits.
    pub fn normalized(self) -> Self {
        Self {
            phone_number: normalize_phone(&self.phone_number),
            group_name: self.group_name,
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudy {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sample_size: i64,
    #[serde(default)]
    pub template_names: Option<String>,
}

impl NewStudy {
    pub fn validate(&self) -> LiftResult<()> {
        if self.name.trim().is_empty() {
            return Err(LiftError::Validation("Study name must not be empty.".into()));
        }
        if self.start_date > self.end_date {
            return Err(LiftError::Validation(format!(
                "start_date {} is after end_date {}.",
                self.start_date, self.end_date
            )));
        }
        if self.sample_size < 0 {
            return Err(LiftError::Validation("sample_size must not be negative.".into()));
        }
        if let Some(names) = &self.template_names {
            validate_template_names(names)?;
        }
        Ok(())
    }
}

/// A single mutable column of a study.
#[derive(Debug, Clone, PartialEq)]
pub enum StudyField {
    Status(StudyStatus),
    AvgMessageCost(f64),
    TemplateNames(String),
}

impl StudyField {
    pub fn column(&self) -> &'static str {
        match self {
            StudyField::Status(_) => "status",
            StudyField::AvgMessageCost(_) => "avg_message_cost",
            StudyField::TemplateNames(_) => "template_names",
        }
    }
}

/// Body of a patch request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub avg_message_cost: Option<serde_json::Value>,
    #[serde(default)]
    pub template_names: Option<String>,
}

impl StudyUpdate {
    /// `avg_message_cost` arrives either as a JSON number or a numeric string.
    pub fn parsed_avg_message_cost(&self) -> LiftResult<Option<f64>> {
        let Some(value) = &self.avg_message_cost else {
            return Ok(None);
        };
        let cost = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match cost {
            Some(c) if c.is_finite() && c >= 0.0 => Ok(Some(c)),
            _ => Err(LiftError::Validation(format!(
                "avg_message_cost must be a non-negative number, got {value}."
            ))),
        }
    }
}

/// Lowercase letters, digits and underscores, or a purely numeric id.
pub fn is_valid_template_name(name: &str) -> bool {
    let numeric = !name.is_empty() && name.chars().all(|c| c.is_ascii_digit());
    let stripped: Vec<char> = name.chars().filter(|c| *c != '_').collect();
    let alnum = !stripped.is_empty() && stripped.iter().all(|c| c.is_ascii_alphanumeric());
    let lower = name.chars().any(|c| c.is_ascii_lowercase())
        && !name.chars().any(|c| c.is_ascii_uppercase());
    (alnum && lower) || numeric
}

/// Validate a comma-separated template list.
pub fn validate_template_names(names: &str) -> LiftResult<()> {
    if names.split(',').all(is_valid_template_name) {
        Ok(())
    } else {
        Err(LiftError::Validation(
            "Template name must be composed by lowercase letters, numbers, and underscores.".into(),
        ))
    }
}
