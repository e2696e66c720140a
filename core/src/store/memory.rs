//! In-process `StudyStore` double. Mirrors the SQLite semantics closely
//! enough for service-level tests; not meant for production use.

use super::StudyStore;
use crate::{
    conversion_filter::StudyWindow,
    error::{LiftError, LiftResult},
    study::{GroupAssignment, Study, StudyField},
    types::{normalize_phone, GroupName, StudyId, StudyStatus},
};
use chrono::NaiveDate;
use std::cell::RefCell;

#[derive(Default)]
pub struct MemoryStudyStore {
    studies: RefCell<Vec<Study>>,
    groups: RefCell<Vec<(StudyId, GroupAssignment)>>,
}

impl MemoryStudyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an assignment without touching arm sizes (raw-table fixture).
    pub fn insert_assignment(&self, study_id: &str, assignment: GroupAssignment) {
        self.groups
            .borrow_mut()
            .push((study_id.to_string(), assignment));
    }

    fn with_study<T>(&self, study_id: &str, f: impl FnOnce(&mut Study) -> T) -> LiftResult<T> {
        let mut studies = self.studies.borrow_mut();
        let study = studies
            .iter_mut()
            .find(|s| s.id == study_id)
            .ok_or_else(|| LiftError::NotFound {
                study_id: study_id.to_string(),
            })?;
        Ok(f(study))
    }
}

impl StudyStore for MemoryStudyStore {
    fn insert_study(&self, study: &Study) -> LiftResult<()> {
        if self.study_exists(&study.id)? {
            return Err(LiftError::Conflict(format!("Study {} already exists.", study.id)));
        }
        self.studies.borrow_mut().push(study.clone());
        Ok(())
    }

    fn study(&self, study_id: &str) -> LiftResult<Option<Study>> {
        Ok(self
            .studies
            .borrow()
            .iter()
            .find(|s| s.id == study_id)
            .cloned())
    }

    fn all_studies(&self) -> LiftResult<Vec<Study>> {
        let mut studies = self.studies.borrow().clone();
        studies.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(studies)
    }

    fn study_exists(&self, study_id: &str) -> LiftResult<bool> {
        Ok(self.studies.borrow().iter().any(|s| s.id == study_id))
    }

    fn update_study_field(&self, study_id: &str, field: &StudyField) -> LiftResult<()> {
        self.with_study(study_id, |s| match field {
            StudyField::Status(status) => s.status = *status,
            StudyField::AvgMessageCost(cost) => s.avg_message_cost = *cost,
            StudyField::TemplateNames(names) => s.template_names = Some(names.clone()),
        })
    }

    fn active_study_id(&self, today: NaiveDate) -> LiftResult<Option<StudyId>> {
        let ids: Vec<StudyId> = self
            .studies
            .borrow()
            .iter()
            .filter(|s| {
                s.status == StudyStatus::Active
                    && StudyWindow::new(s.start_date, s.end_date).contains(today)
            })
            .map(|s| s.id.clone())
            .collect();
        match ids.len() {
            0 => Ok(None),
            1 => Ok(ids.into_iter().next()),
            n => Err(LiftError::Data(format!("More than one active study found ({n})."))),
        }
    }

    fn group_assignments(&self, study_id: &str) -> LiftResult<Vec<GroupAssignment>> {
        Ok(self
            .groups
            .borrow()
            .iter()
            .filter(|(id, _)| id == study_id)
            .map(|(_, a)| a.clone())
            .collect())
    }

    fn group_of(&self, study_id: &str, phone_number: &str) -> LiftResult<Option<GroupName>> {
        let phone = normalize_phone(phone_number);
        Ok(self
            .groups
            .borrow()
            .iter()
            .find(|(id, a)| id == study_id && a.phone_number == phone)
            .map(|(_, a)| a.group_name))
    }

    fn assign_to_group(
        &self,
        study_id: &str,
        phone_number: &str,
        group: GroupName,
    ) -> LiftResult<()> {
        self.with_study(study_id, |s| match group {
            GroupName::Control => s.control_group_size += 1,
            GroupName::Test => s.test_group_size += 1,
        })?;
        self.insert_assignment(
            study_id,
            GroupAssignment::new(&normalize_phone(phone_number), group),
        );
        Ok(())
    }

    fn increment_messages_count(&self, study_id: &str) -> LiftResult<()> {
        self.with_study(study_id, |s| s.messages_count += 1)
    }
}
