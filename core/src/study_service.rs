//! Study lifecycle and results orchestration.
//!
//! LIFECYCLE: `active <-> paused`. At most one study is active, where
//! active means `status = 'active' AND start_date <= today <= end_date`.
//!
//! RESULTS ORDER (each stage aborts the fetch with study + stage context):
//!   1. Load the study row and validate both arm sizes.
//!   2. Load the event log and the arm assignments, filter conversions.
//!   3. Compute arm metrics, significance, lift and cost.
//!
//! Every call is request-scoped: the service owns no connection and keeps
//! no state between calls.

use crate::{
    blob::BlobStore,
    config::LiftConfig,
    conversion_filter::{filter_conversions, StudyWindow, ValidConversions},
    error::{LiftError, LiftResult, StageContext},
    lift::{cost_per_incremental_conversion, incremental_conversions},
    metric::Metric,
    results::StudyResults,
    store::StudyStore,
    study::{validate_template_names, GroupAssignment, NewStudy, Study, StudyField, StudyUpdate},
    study_stats::{study_stats, StudyStats},
    types::{StudyId, StudyStatus},
};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Fields a patch actually changed. Empty for a pure no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdatedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StudyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_message_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_names: Option<String>,
}

impl UpdatedFields {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.avg_message_cost.is_none() && self.template_names.is_none()
    }
}

pub struct StudyService<'a> {
    store: &'a dyn StudyStore,
    blobs: &'a dyn BlobStore,
    config: &'a LiftConfig,
}

impl<'a> StudyService<'a> {
    pub fn new(store: &'a dyn StudyStore, blobs: &'a dyn BlobStore, config: &'a LiftConfig) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }

    fn today(&self) -> NaiveDate {
        self.config.clock.today()
    }

    // ── Create ────────────────────────────────────────────────────

    /// Create a new study. Rejected while another study is active.
    pub fn create_study(&self, request: NewStudy) -> LiftResult<StudyId> {
        log::info!("Creating lift study '{}'", request.name);
        request.validate()?;

        let study_id = Uuid::new_v4().simple().to_string();
        let study = Study::new(study_id.clone(), request);
        self.store.insert_study_exclusive(&study, self.today())?;

        log::info!("Created lift study {study_id}");
        Ok(study_id)
    }

    // ── Read ──────────────────────────────────────────────────────

    pub fn list_studies(&self) -> LiftResult<Vec<Study>> {
        log::info!("Getting all lift studies");
        self.store.all_studies()
    }

    /// Recompute the full result record for `study_id` from the event log.
    pub fn study_results(
        &self,
        study_id: &str,
        conversion_event_name: &str,
    ) -> LiftResult<StudyResults> {
        log::info!("Getting lift study results for {study_id} ({conversion_event_name})");
        self.ensure_exists(study_id)?;

        let study = self
            .load_study(study_id)
            .stage(study_id, "fetching data")?;

        let valid = self
            .load_valid_conversions(&study, conversion_event_name)
            .stage(
                study_id,
                &format!("fetching valid conversion events ({conversion_event_name})"),
            )?;

        let (stats, incremental, cost) = self
            .compute_metrics(&study, &valid)
            .stage(study_id, "calculating metrics")?;

        Ok(StudyResults::assemble(&study, &stats, incremental, cost))
    }

    fn load_study(&self, study_id: &str) -> LiftResult<Study> {
        log::info!("Fetching study data");
        let study = self.store.study(study_id)?.ok_or_else(|| LiftError::NotFound {
            study_id: study_id.to_string(),
        })?;
        if study.control_group_size <= 0 || study.test_group_size <= 0 {
            return Err(LiftError::Data("Group sizes must be greater than 0.".into()));
        }
        Ok(study)
    }

    fn load_valid_conversions(
        &self,
        study: &Study,
        conversion_event_name: &str,
    ) -> LiftResult<ValidConversions> {
        log::info!(
            "Reading conversions from {}/{}",
            self.config.bucket,
            self.config.events_key
        );
        let events = self
            .blobs
            .conversions(&self.config.bucket, &self.config.events_key)?;

        log::info!("Reading study groups");
        let assignments: Vec<GroupAssignment> = self
            .store
            .group_assignments(&study.id)?
            .into_iter()
            .map(GroupAssignment::normalized)
            .collect();

        log::info!("Filtering valid conversions");
        let valid = filter_conversions(
            &events,
            StudyWindow::new(study.start_date, study.end_date),
            conversion_event_name,
            &assignments,
        );
        if valid.is_empty() {
            return Err(LiftError::Data("No valid conversions found.".into()));
        }
        Ok(valid)
    }

    fn compute_metrics(
        &self,
        study: &Study,
        valid: &ValidConversions,
    ) -> LiftResult<(StudyStats, i64, Metric)> {
        log::info!("Calculating metrics");
        let stats = study_stats(
            valid,
            study.control_group_size,
            study.test_group_size,
            self.config.alpha,
        )?;
        let incremental = incremental_conversions(stats.test.conversions, stats.control.conversions);
        let cost =
            cost_per_incremental_conversion(study.avg_message_cost, study.messages_count, incremental);
        log::debug!(
            "lift={} p={} incremental={incremental} cost={cost}",
            stats.lift,
            stats.p_value
        );
        Ok((stats, incremental, cost))
    }

    // ── Update ────────────────────────────────────────────────────

    /// Apply a partial update. All fields are validated before any write.
    pub fn update_study(&self, study_id: &str, update: &StudyUpdate) -> LiftResult<UpdatedFields> {
        log::info!("Updating lift study {study_id}");
        self.ensure_exists(study_id)?;

        let new_status = update.status.as_deref().map(StudyStatus::parse).transpose()?;
        let new_cost = update.parsed_avg_message_cost()?;
        if let Some(names) = &update.template_names {
            validate_template_names(names)?;
        }

        let mut updated = UpdatedFields::default();

        if let Some(status) = new_status {
            if self.set_status(study_id, status)? {
                updated.status = Some(status);
            }
        }

        if let Some(cost) = new_cost {
            self.store
                .update_study_field(study_id, &StudyField::AvgMessageCost(cost))?;
            updated.avg_message_cost = Some(cost);
        }

        if let Some(names) = &update.template_names {
            self.store
                .update_study_field(study_id, &StudyField::TemplateNames(names.clone()))?;
            updated.template_names = Some(names.clone());
        }

        Ok(updated)
    }

    /// Returns whether the status was written. Activating the active study
    /// and pausing a study that is not the active one are no-ops.
    fn set_status(&self, study_id: &str, status: StudyStatus) -> LiftResult<bool> {
        let today = self.today();
        let is_active = self.store.active_study_id(today)?.as_deref() == Some(study_id);

        match status {
            StudyStatus::Active if is_active => {
                log::debug!("study {study_id} is already active");
                Ok(false)
            }
            StudyStatus::Paused if !is_active => {
                log::debug!("study {study_id} is not the active study; nothing to pause");
                Ok(false)
            }
            StudyStatus::Active => {
                self.store.activate_exclusive(study_id, today).map_err(|e| {
                    log::warn!("refused to activate {study_id}: {e}");
                    e
                })?;
                Ok(true)
            }
            StudyStatus::Paused => {
                self.store
                    .update_study_field(study_id, &StudyField::Status(StudyStatus::Paused))?;
                Ok(true)
            }
        }
    }

    fn ensure_exists(&self, study_id: &str) -> LiftResult<()> {
        if self.store.study_exists(study_id)? {
            Ok(())
        } else {
            Err(LiftError::NotFound {
                study_id: study_id.to_string(),
            })
        }
    }
}
