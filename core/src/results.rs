//! The result record returned for a study. Derived on every fetch from
//! the event log; never persisted.

use crate::{
    metric::{round_to, Metric},
    study::Study,
    study_stats::StudyStats,
};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyResults {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sample_size: i64,
    pub test_num_conversions: i64,
    pub test_group_size: i64,
    pub test_conversion_rate: f64,
    pub test_conversion_rate_confidence_interval: [f64; 2],
    pub control_num_conversions: i64,
    pub control_group_size: i64,
    pub control_conversion_rate: f64,
    pub control_conversion_rate_confidence_interval: [f64; 2],
    pub incremental_conversions: i64,
    pub lift: Metric,
    pub cost_per_incremental_conversion: Metric,
    pub p_value: Metric,
}

impl StudyResults {
    /// Rates, intervals, lift and p-value to 4 decimals; cost to 2.
    pub fn assemble(
        study: &Study,
        stats: &StudyStats,
        incremental_conversions: i64,
        cost_per_incremental_conversion: Metric,
    ) -> Self {
        let ci = |(low, high): (f64, f64)| [round_to(low, 4), round_to(high, 4)];
        Self {
            name: study.name.clone(),
            start_date: study.start_date,
            end_date: study.end_date,
            sample_size: study.sample_size,
            test_num_conversions: stats.test.conversions,
            test_group_size: stats.test.group_size,
            test_conversion_rate: round_to(stats.test.conversion_rate, 4),
            test_conversion_rate_confidence_interval: ci(stats.test.confidence_interval),
            control_num_conversions: stats.control.conversions,
            control_group_size: stats.control.group_size,
            control_conversion_rate: round_to(stats.control.conversion_rate, 4),
            control_conversion_rate_confidence_interval: ci(stats.control.confidence_interval),
            incremental_conversions,
            lift: stats.lift.round(4),
            cost_per_incremental_conversion: cost_per_incremental_conversion.round(2),
            p_value: stats.p_value.round(4),
        }
    }
}
